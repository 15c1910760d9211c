//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryAuth / InMemoryRecordStore / InMemoryObjectStorage**:
//!   外部サービスのインメモリ版。故障注入（`FaultInjector`）に対応
//! - **ScriptedPicker**: 権限・選択結果を台本どおりに返すピッカー
//! - **FilePicker**: ローカルファイルを 1 枚選ぶピッカー（CLI 用）
//! - **TracingEventSink / RecordingEventSink**
//! - **InMemoryBackend**: auth / records / storage をまとめたもの（テスト・CLI 用）
//!
//! 実サービス向けの HTTP クライアントはこのクレートには含めない。

pub mod fault;
pub mod inmem_auth;
pub mod inmem_records;
pub mod inmem_storage;
pub mod scripted_picker;
pub mod file_picker;
pub mod event_sinks;
pub mod backend;

// 主要な型を再エクスポート
pub use self::fault::{FaultInjector, FaultPoint};
pub use self::inmem_auth::InMemoryAuth;
pub use self::inmem_records::InMemoryRecordStore;
pub use self::inmem_storage::{DEFAULT_BASE_URL, InMemoryObjectStorage, UploadGate};
pub use self::scripted_picker::ScriptedPicker;
pub use self::file_picker::FilePicker;
pub use self::event_sinks::{RecordingEventSink, TracingEventSink};
pub use self::backend::InMemoryBackend;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// ロック中に panic したテストがあっても状態は読めるようにする
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
