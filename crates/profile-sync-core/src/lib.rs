//! profile-sync-core
//!
//! Client-side session tracking and profile-avatar sync on top of an external
//! auth / record / object-storage service.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, principal, profile, media, upload, errors, events）
//! - **ports**: 抽象化レイヤー（AuthProvider, RecordStore, ObjectStorage, MediaPicker, など）
//! - **app**: アプリケーションロジック（builder, session, accounts, profile_sync, 画面状態）
//! - **impls**: 実装（インメモリのバックエンドなど開発用）
//! - **config**: `SyncConfig`（環境変数 / JSON）
//! - **observability**: tracing の初期化と集計

pub mod domain;
pub mod ports;
pub mod app;
pub mod impls;
pub mod config;
pub mod observability;

pub use crate::app::{App, AppBuilder};
pub use crate::config::SyncConfig;
