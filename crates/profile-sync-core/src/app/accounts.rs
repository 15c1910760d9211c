//! Accounts - sign-up / sign-in / sign-out against the auth port.

use std::sync::Arc;

use crate::domain::{Credentials, DomainEvent, Principal, SignUp, SyncError};
use crate::ports::{AuthProvider, EventSink};

use super::profiles::ProfileRepository;

pub struct Accounts {
    auth: Arc<dyn AuthProvider>,
    profiles: ProfileRepository,
    events: Arc<dyn EventSink>,
}

impl Accounts {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: ProfileRepository,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            auth,
            profiles,
            events,
        }
    }

    /// Create the account, then its profile row.
    ///
    /// Returns only after the row exists, so a caller that reports success
    /// never races the row creation.
    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp, SyncError> {
        let signed_up = self.auth.sign_up(credentials).await?;
        let principal_id = &signed_up.principal.id;

        if self.profiles.create_stub(principal_id).await? {
            self.events.emit(&DomainEvent::ProfileCreated {
                principal_id: principal_id.clone(),
            });
        }
        tracing::info!(
            principal = %principal_id,
            confirmation_required = signed_up.confirmation_required,
            "account created"
        );
        Ok(signed_up)
    }

    /// Establish a session. Session listeners observe the new principal on
    /// their own.
    ///
    /// A missing profile row (e.g. the stub insert failed at sign-up) is
    /// created here; failing to do so does not fail the sign-in.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, SyncError> {
        let principal = self.auth.sign_in(credentials).await?;
        match self.profiles.create_stub(&principal.id).await {
            Ok(true) => {
                tracing::info!(principal = %principal.id, "created missing profile record");
                self.events.emit(&DomainEvent::ProfileCreated {
                    principal_id: principal.id.clone(),
                });
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(principal = %principal.id, error = %err, "could not ensure profile record");
            }
        }
        Ok(principal)
    }

    pub async fn sign_out(&self) -> Result<(), SyncError> {
        self.auth.sign_out().await?;
        Ok(())
    }
}
