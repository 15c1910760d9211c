use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt};

use crate::domain::{DomainEvent, UploadState};

/// Install the global `fmt` subscriber. `RUST_LOG` overrides the `info`
/// default. Calling it again (e.g. from several tests) is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// Upload attempts by terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCounts {
    pub linked: usize,
    pub cancelled: usize,
    pub permission_denied: usize,
    pub upload_failed: usize,
    pub link_failed: usize,
}

impl UploadCounts {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a DomainEvent>) -> Self {
        let mut counts = Self::default();
        for event in events {
            if let DomainEvent::UploadTransition { to, .. } = event {
                counts.record(*to);
            }
        }
        counts
    }

    pub fn record(&mut self, terminal: UploadState) {
        match terminal {
            UploadState::Linked => self.linked += 1,
            UploadState::Cancelled => self.cancelled += 1,
            UploadState::PermissionDenied => self.permission_denied += 1,
            UploadState::UploadFailed => self.upload_failed += 1,
            UploadState::LinkFailed => self.link_failed += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.linked + self.cancelled + self.permission_denied + self.upload_failed + self.link_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttemptId, PrincipalId};
    use ulid::Ulid;

    fn transition(from: UploadState, to: UploadState) -> DomainEvent {
        DomainEvent::UploadTransition {
            attempt_id: AttemptId::from_ulid(Ulid::new()),
            principal_id: PrincipalId::new("u-1"),
            from,
            to,
        }
    }

    #[test]
    fn counts_only_terminal_transitions() {
        let events = vec![
            transition(UploadState::Idle, UploadState::Picking),
            transition(UploadState::Picking, UploadState::Cancelled),
            transition(UploadState::Uploaded, UploadState::Linking),
            transition(UploadState::Linking, UploadState::LinkFailed),
            transition(UploadState::Linking, UploadState::Linked),
        ];
        let counts = UploadCounts::from_events(&events);
        assert_eq!(
            counts,
            UploadCounts {
                linked: 1,
                cancelled: 1,
                link_failed: 1,
                ..UploadCounts::default()
            }
        );
        assert_eq!(counts.total(), 3);
    }
}
