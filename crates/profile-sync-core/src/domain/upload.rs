//! Upload workflow state machine.
//!
//! One invocation of the avatar workflow walks:
//!
//! ```text
//! Idle -> Picking -> (Cancelled | PermissionDenied | Picked)
//!      -> Uploading -> (UploadFailed | Uploaded)
//!      -> Linking -> (LinkFailed | Linked)
//! ```
//!
//! `Linked` is the only success terminal. `Uploaded` is the recorded
//! intermediate state: the object exists in storage but the profile record
//! has not been pointed at it yet. A `PendingLink` captures that state so the
//! link phase can be retried on its own.

use serde::{Deserialize, Serialize};

use super::errors::SyncError;
use super::ids::{AttemptId, PrincipalId};
use super::profile::AvatarRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadState {
    Idle,
    Picking,
    Cancelled,
    PermissionDenied,
    Picked,
    Uploading,
    UploadFailed,
    Uploaded,
    Linking,
    LinkFailed,
    Linked,
}

impl UploadState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UploadState::Cancelled
                | UploadState::PermissionDenied
                | UploadState::UploadFailed
                | UploadState::LinkFailed
                | UploadState::Linked
        )
    }

    pub fn is_success(self) -> bool {
        self == UploadState::Linked
    }

    pub fn can_transition_to(self, next: UploadState) -> bool {
        use UploadState::*;
        matches!(
            (self, next),
            (Idle, Picking)
                | (Idle, Picked)
                | (Picking, Cancelled)
                | (Picking, PermissionDenied)
                | (Picking, Picked)
                | (Picked, Uploading)
                | (Uploading, UploadFailed)
                | (Uploading, Uploaded)
                | (Uploaded, Linking)
                | (Linking, LinkFailed)
                | (Linking, Linked)
        )
    }
}

/// Tracks the states one attempt has passed through.
#[derive(Debug, Clone)]
pub struct UploadAttempt {
    pub attempt_id: AttemptId,
    pub principal_id: PrincipalId,
    trail: Vec<UploadState>,
}

impl UploadAttempt {
    pub fn new(attempt_id: AttemptId, principal_id: PrincipalId) -> Self {
        Self {
            attempt_id,
            principal_id,
            trail: vec![UploadState::Idle],
        }
    }

    /// Continue an attempt whose object is already stored.
    pub fn resume(pending: &PendingLink) -> Self {
        Self {
            attempt_id: pending.attempt_id,
            principal_id: pending.principal_id.clone(),
            trail: vec![UploadState::Uploaded],
        }
    }

    pub fn state(&self) -> UploadState {
        // trail は空にならない
        self.trail.last().copied().unwrap_or(UploadState::Idle)
    }

    pub fn trail(&self) -> &[UploadState] {
        &self.trail
    }

    pub fn advance(&mut self, next: UploadState) -> Result<UploadState, SyncError> {
        let from = self.state();
        if !from.can_transition_to(next) {
            return Err(SyncError::InvalidTransition { from, to: next });
        }
        self.trail.push(next);
        Ok(from)
    }

    pub fn finish(self, outcome: UploadOutcome) -> UploadReport {
        UploadReport {
            attempt_id: self.attempt_id,
            principal_id: self.principal_id,
            trail: self.trail,
            outcome,
        }
    }
}

/// An object that was stored but not yet linked to the profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLink {
    pub attempt_id: AttemptId,
    pub principal_id: PrincipalId,
    pub bucket: String,
    pub path: String,
    /// Present once the public reference has been issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ref: Option<AvatarRef>,
}

/// Terminal result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Linked(AvatarRef),
    Cancelled,
    PermissionDenied,
    UploadFailed(SyncError),
    /// Always carries a `SyncError::PartialUpload`.
    LinkFailed(SyncError),
}

impl UploadOutcome {
    pub fn terminal(&self) -> UploadState {
        match self {
            UploadOutcome::Linked(_) => UploadState::Linked,
            UploadOutcome::Cancelled => UploadState::Cancelled,
            UploadOutcome::PermissionDenied => UploadState::PermissionDenied,
            UploadOutcome::UploadFailed(_) => UploadState::UploadFailed,
            UploadOutcome::LinkFailed(_) => UploadState::LinkFailed,
        }
    }
}

/// What the caller learns about one attempt.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub attempt_id: AttemptId,
    pub principal_id: PrincipalId,
    pub trail: Vec<UploadState>,
    pub outcome: UploadOutcome,
}

impl UploadReport {
    pub fn terminal(&self) -> UploadState {
        self.outcome.terminal()
    }

    pub fn is_success(&self) -> bool {
        self.terminal().is_success()
    }

    pub fn reached(&self, state: UploadState) -> bool {
        self.trail.contains(&state)
    }

    pub fn avatar(&self) -> Option<&AvatarRef> {
        match &self.outcome {
            UploadOutcome::Linked(avatar) => Some(avatar),
            _ => None,
        }
    }

    pub fn pending_link(&self) -> Option<&PendingLink> {
        match &self.outcome {
            UploadOutcome::LinkFailed(err) => err.pending_link(),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<AvatarRef, SyncError> {
        match self.outcome {
            UploadOutcome::Linked(avatar) => Ok(avatar),
            UploadOutcome::Cancelled => Err(SyncError::Cancelled),
            UploadOutcome::PermissionDenied => Err(SyncError::PermissionDenied),
            UploadOutcome::UploadFailed(err) | UploadOutcome::LinkFailed(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn attempt() -> UploadAttempt {
        UploadAttempt::new(AttemptId::from_ulid(Ulid::new()), PrincipalId::new("u-1"))
    }

    #[test]
    fn happy_path_reaches_linked() {
        let mut a = attempt();
        for next in [
            UploadState::Picking,
            UploadState::Picked,
            UploadState::Uploading,
            UploadState::Uploaded,
            UploadState::Linking,
            UploadState::Linked,
        ] {
            a.advance(next).unwrap();
        }
        assert!(a.state().is_terminal());
        assert!(a.state().is_success());
        assert_eq!(a.trail().len(), 7);
    }

    #[rstest]
    #[case(UploadState::Idle, UploadState::Uploading)]
    #[case(UploadState::Picking, UploadState::Uploaded)]
    #[case(UploadState::PermissionDenied, UploadState::Picked)]
    #[case(UploadState::UploadFailed, UploadState::Linking)]
    #[case(UploadState::Linked, UploadState::Linking)]
    fn rejects_skipped_or_post_terminal_transitions(
        #[case] from: UploadState,
        #[case] to: UploadState,
    ) {
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn advance_reports_invalid_transition() {
        let mut a = attempt();
        let err = a.advance(UploadState::Linked).unwrap_err();
        assert_eq!(
            err,
            SyncError::InvalidTransition {
                from: UploadState::Idle,
                to: UploadState::Linked
            }
        );
        assert_eq!(a.state(), UploadState::Idle);
    }

    #[test]
    fn resumed_attempt_starts_at_uploaded() {
        let pending = PendingLink {
            attempt_id: AttemptId::from_ulid(Ulid::new()),
            principal_id: PrincipalId::new("u-1"),
            bucket: "avatars".into(),
            path: "avatars/u-1/avatar.png".into(),
            public_ref: None,
        };
        let mut a = UploadAttempt::resume(&pending);
        assert_eq!(a.attempt_id, pending.attempt_id);
        a.advance(UploadState::Linking).unwrap();
        a.advance(UploadState::Linked).unwrap();
        assert!(!a.trail().contains(&UploadState::Uploading));
    }

    #[test]
    fn only_linked_is_success() {
        let all = [
            UploadState::Cancelled,
            UploadState::PermissionDenied,
            UploadState::UploadFailed,
            UploadState::LinkFailed,
        ];
        for s in all {
            assert!(s.is_terminal());
            assert!(!s.is_success());
        }
        assert!(!UploadState::Uploaded.is_terminal());
    }
}
