//! Errors - エラー型と分類
//!
//! - `BackendError`: 外部サービス（auth / records / storage / picker）が返した失敗。
//!   メッセージはサービスの文言をそのまま保持する。
//! - `SyncError`: クライアント側ワークフローの失敗分類。
//! - `ErrorKind`: 運用上の分類（リトライに意味があるかどうか）。

use std::fmt;

use thiserror::Error;

use super::ids::PrincipalId;
use super::upload::{PendingLink, UploadState};

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（ユーザー操作での再試行に意味がある）
/// - Permanent: 恒久的なエラー（同じ入力で再試行しても無意味）
/// - Infrastructure: 外部サービス側の障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Which external capability produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Auth,
    Records,
    Storage,
    Picker,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Auth => "auth",
            Service::Records => "records",
            Service::Storage => "storage",
            Service::Picker => "picker",
        };
        f.write_str(name)
    }
}

/// A rejected call to an external capability (network or service side).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service}: {message}")]
pub struct BackendError {
    pub service: Service,
    pub message: String,
}

impl BackendError {
    pub fn new(service: Service, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(Service::Auth, message)
    }

    pub fn records(message: impl Into<String>) -> Self {
        Self::new(Service::Records, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(Service::Storage, message)
    }

    pub fn picker(message: impl Into<String>) -> Self {
        Self::new(Service::Picker, message)
    }
}

/// Failure of a session or profile operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("media library permission denied")]
    PermissionDenied,

    #[error("image pick cancelled")]
    Cancelled,

    #[error("no profile record for principal {0}")]
    NotFound(PrincipalId),

    #[error("{count} profile records match principal {principal}")]
    Ambiguous { principal: PrincipalId, count: usize },

    #[error(transparent)]
    Transport(#[from] BackendError),

    /// The object was stored but the profile record still points at the
    /// previous avatar. `pending` resumes the link step alone.
    #[error("avatar stored at {} but linking failed: {source}", pending.path)]
    PartialUpload {
        pending: Box<PendingLink>,
        source: Box<SyncError>,
    },

    #[error("an avatar upload is already in flight for principal {0}")]
    UploadInFlight(PrincipalId),

    #[error("invalid avatar reference {value:?}: {reason}")]
    InvalidReference { value: String, reason: String },

    #[error("invalid upload transition {from:?} -> {to:?}")]
    InvalidTransition { from: UploadState, to: UploadState },

    #[error("{0}")]
    InvalidInput(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::PermissionDenied
            | SyncError::Cancelled
            | SyncError::UploadInFlight(_) => ErrorKind::Transient,
            SyncError::NotFound(_)
            | SyncError::Ambiguous { .. }
            | SyncError::InvalidReference { .. }
            | SyncError::InvalidTransition { .. }
            | SyncError::InvalidInput(_) => ErrorKind::Permanent,
            SyncError::Transport(_) => ErrorKind::Infrastructure,
            SyncError::PartialUpload { source, .. } => source.kind(),
        }
    }

    /// Is the avatar-reference invariant currently violated because of this
    /// failure?
    pub fn is_partial_upload(&self) -> bool {
        matches!(self, SyncError::PartialUpload { .. })
    }

    pub fn pending_link(&self) -> Option<&PendingLink> {
        match self {
            SyncError::PartialUpload { pending, .. } => Some(&**pending),
            _ => None,
        }
    }
}
