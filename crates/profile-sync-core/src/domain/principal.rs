//! Principal and session model.

use serde::{Deserialize, Serialize};

use super::errors::SyncError;
use super::ids::PrincipalId;

/// The authenticated identity as reported by the auth service.
///
/// The client only ever holds a cached copy; it may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
}

impl Principal {
    pub fn new(id: impl Into<PrincipalId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// Email + password pair submitted from the auth form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Trims the email and rejects empty fields before anything reaches the
    /// auth service.
    pub fn new(email: &str, password: &str) -> Result<Self, SyncError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(SyncError::InvalidInput("email is required".into()));
        }
        if !email.contains('@') {
            return Err(SyncError::InvalidInput(format!(
                "{email:?} is not an email address"
            )));
        }
        if password.is_empty() {
            return Err(SyncError::InvalidInput("password is required".into()));
        }
        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

// password は絶対にログに出さない
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a successful sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub principal: Principal,
    /// The account must be confirmed out of band (e.g. email link) before a
    /// session becomes active.
    pub confirmation_required: bool,
}

/// Kind of session transition reported by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One session-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub kind: AuthChangeKind,
    /// Principal of the session after the transition; `None` when signed out.
    pub principal: Option<Principal>,
}

impl SessionEvent {
    pub fn signed_in(principal: Principal) -> Self {
        Self {
            kind: AuthChangeKind::SignedIn,
            principal: Some(principal),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthChangeKind::SignedOut,
            principal: None,
        }
    }
}

/// What the session provider currently exposes.
///
/// `generation` increases every time the principal identity changes
/// (sign-in as someone else, sign-out). Token refreshes for the same principal
/// keep the generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub principal: Option<Principal>,
}

impl SessionSnapshot {
    /// Context for profile operations, if a principal is present.
    pub fn context(&self) -> Option<PrincipalContext> {
        self.principal.as_ref().map(|principal| PrincipalContext {
            principal: principal.clone(),
            generation: self.generation,
        })
    }
}

/// The principal a profile operation is issued for, captured at issue time.
///
/// Passed explicitly into every profile call. The generation lets callers
/// recognise results that belong to a principal that is no longer current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    generation: u64,
}

impl PrincipalContext {
    pub fn new(principal: Principal, generation: u64) -> Self {
        Self {
            principal,
            generation,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> &PrincipalId {
        &self.principal.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Does this context still describe `snapshot`?
    pub fn is_current(&self, snapshot: &SessionSnapshot) -> bool {
        snapshot.generation == self.generation
            && snapshot
                .principal
                .as_ref()
                .is_some_and(|p| p.id == self.principal.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "secret")]
    #[case("   ", "secret")]
    #[case("not-an-email", "secret")]
    #[case("a@example.com", "")]
    fn credentials_reject_bad_input(#[case] email: &str, #[case] password: &str) {
        let err = Credentials::new(email, password).unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
    }

    #[test]
    fn credentials_trim_email_and_redact_password() {
        let creds = Credentials::new("  a@example.com ", "hunter2").unwrap();
        assert_eq!(creds.email, "a@example.com");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn context_is_current_only_for_same_generation_and_principal() {
        let alice = Principal::new("u-1", "alice@example.com");
        let snapshot = SessionSnapshot {
            generation: 3,
            principal: Some(alice.clone()),
        };
        let ctx = snapshot.context().unwrap();
        assert!(ctx.is_current(&snapshot));

        let later = SessionSnapshot {
            generation: 4,
            principal: Some(alice),
        };
        assert!(!ctx.is_current(&later));

        let signed_out = SessionSnapshot {
            generation: 3,
            principal: None,
        };
        assert!(!ctx.is_current(&signed_out));
        assert!(signed_out.context().is_none());
    }

    #[test]
    fn change_kind_serializes_screaming_snake_case() {
        let s = serde_json::to_string(&AuthChangeKind::TokenRefreshed).unwrap();
        assert_eq!(s, "\"TOKEN_REFRESHED\"");
    }
}
