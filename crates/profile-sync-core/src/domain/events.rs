//! Events - ドメインイベント
//!
//! EventSink に渡される観測用のイベント。UI 状態には影響しない。

use super::ids::{AttemptId, PrincipalId};
use super::principal::AuthChangeKind;
use super::upload::UploadState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// The session provider applied a session-change notification.
    SessionChanged {
        kind: AuthChangeKind,
        principal_id: Option<PrincipalId>,
        generation: u64,
    },

    /// A stub profile row was created at sign-up.
    ProfileCreated { principal_id: PrincipalId },

    /// An upload attempt moved between workflow states.
    UploadTransition {
        attempt_id: AttemptId,
        principal_id: PrincipalId,
        from: UploadState,
        to: UploadState,
    },

    /// A result was computed for a principal that is no longer current and
    /// was not applied.
    StaleResultDiscarded {
        principal_id: PrincipalId,
        generation: u64,
    },
}
