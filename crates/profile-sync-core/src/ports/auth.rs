//! AuthProvider port - 外部認証サービス
//!
//! パスワード認証・セッション永続化はすべて外部サービスの責務。
//! クライアントはセッション変化の通知を購読し、`Subscription` で解除する。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BackendError, Credentials, Principal, SessionEvent, SignUp};

/// Callback invoked for every session-change notification.
pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// AuthProvider は外部認証サービスへのインターフェース
///
/// # 設計原則
/// - すべて単発呼び出し（リトライしない）
/// - 失敗メッセージはサービスの文言をそのまま `BackendError` に入れる
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp, BackendError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Session currently persisted by the service, if any.
    async fn current_session(&self) -> Result<Option<Principal>, BackendError>;

    /// Register `listener` for session transitions.
    fn subscribe(&self, listener: SessionListener) -> Subscription;
}

/// Handle returned by [`AuthProvider::subscribe`].
///
/// Release it with [`Subscription::unsubscribe`]. Dropping an unreleased
/// handle still deregisters the listener but logs a warning.
#[must_use = "release the listener with `unsubscribe()`"]
pub struct Subscription {
    disposer: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disposer: Some(Box::new(disposer)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.disposer.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.disposer.take() {
            tracing::warn!("session subscription dropped without unsubscribe()");
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.disposer.is_some())
            .finish()
    }
}
