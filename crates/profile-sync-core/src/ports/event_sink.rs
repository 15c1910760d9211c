//! EventSink port - イベント記録の抽象化
//!
//! # 実装
//! - TracingEventSink: tracing に流す（デフォルト）
//! - RecordingEventSink: テスト用にメモリへ保持

use crate::domain::DomainEvent;

/// EventSink はドメインイベントを記録
///
/// 同期呼び出し。記録の失敗でワークフローを止めてはいけない。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DomainEvent);
}
