//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部サービス（認証、テーブルストア、オブジェクトストレージ、
//! 端末の画像ピッカー）へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 外部呼び出しはすべて単発（リトライしない）
//! - 失敗は `BackendError` にサービスの文言のまま載せる
//! - ストレージとテーブルの間にトランザクションはない

pub mod auth;
pub mod record_store;
pub mod object_storage;
pub mod media_picker;
pub mod clock;
pub mod id_generator;
pub mod event_sink;

// 主要な trait を再エクスポート
pub use self::auth::{AuthProvider, SessionListener, Subscription};
pub use self::record_store::{EqFilter, RecordError, RecordStore, Row};
pub use self::object_storage::{ObjectStorage, UploadOptions};
pub use self::media_picker::MediaPicker;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::event_sink::EventSink;
