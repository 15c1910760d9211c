//! InMemoryAuth - 開発用の認証サービス
//!
//! # 実装詳細
//! - アカウントは email をキーに HashMap で保持
//! - リスナーはロックの外で呼ぶ（リスナー内から auth を呼んでもデッドロックしない）
//! - `require_confirmation` が true なら sign-up 直後はセッションを張らない

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ulid::Ulid;

use super::fault::{FaultInjector, FaultPoint};
use super::lock;
use crate::domain::{
    AuthChangeKind, BackendError, Credentials, Principal, SessionEvent, SignUp,
};
use crate::ports::{AuthProvider, SessionListener, Subscription};

struct Account {
    principal: Principal,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    session: Option<Principal>,
    listeners: HashMap<u64, SessionListener>,
    next_listener_id: u64,
}

pub struct InMemoryAuth {
    state: Arc<Mutex<AuthState>>,
    require_confirmation: bool,
    faults: FaultInjector,
}

impl InMemoryAuth {
    pub fn new(require_confirmation: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(AuthState::default())),
            require_confirmation,
            faults: FaultInjector::new(),
        }
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Mark the account as confirmed (the user clicked the email link).
    pub fn confirm_email(&self, email: &str) -> bool {
        match lock(&self.state).accounts.get_mut(email) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Simulate the service rotating the access token of the current session.
    pub fn refresh_token(&self) {
        let principal = lock(&self.state).session.clone();
        if principal.is_some() {
            self.notify(&SessionEvent {
                kind: AuthChangeKind::TokenRefreshed,
                principal,
            });
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    fn check(&self, point: FaultPoint) -> Result<(), BackendError> {
        match self.faults.check(point) {
            Some(message) => Err(BackendError::auth(message)),
            None => Ok(()),
        }
    }

    fn notify(&self, event: &SessionEvent) {
        let listeners: Vec<SessionListener> =
            lock(&self.state).listeners.values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl Default for InMemoryAuth {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp, BackendError> {
        self.check(FaultPoint::SignUp)?;

        let principal = {
            let mut state = lock(&self.state);
            if state.accounts.contains_key(&credentials.email) {
                return Err(BackendError::auth("User already registered"));
            }
            let principal = Principal::new(Ulid::new().to_string(), credentials.email.clone());
            state.accounts.insert(
                credentials.email.clone(),
                Account {
                    principal: principal.clone(),
                    password: credentials.password.clone(),
                    confirmed: !self.require_confirmation,
                },
            );
            if !self.require_confirmation {
                state.session = Some(principal.clone());
            }
            principal
        };

        if !self.require_confirmation {
            self.notify(&SessionEvent::signed_in(principal.clone()));
        }
        Ok(SignUp {
            principal,
            confirmation_required: self.require_confirmation,
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Principal, BackendError> {
        self.check(FaultPoint::SignIn)?;

        let principal = {
            let mut state = lock(&self.state);
            let account = state
                .accounts
                .get(&credentials.email)
                .filter(|a| a.password == credentials.password)
                .ok_or_else(|| BackendError::auth("Invalid login credentials"))?;
            if !account.confirmed {
                return Err(BackendError::auth("Email not confirmed"));
            }
            let principal = account.principal.clone();
            state.session = Some(principal.clone());
            principal
        };

        self.notify(&SessionEvent::signed_in(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.check(FaultPoint::SignOut)?;
        lock(&self.state).session = None;
        self.notify(&SessionEvent::signed_out());
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Principal>, BackendError> {
        self.check(FaultPoint::CurrentSession)?;
        Ok(lock(&self.state).session.clone())
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, listener);
            id
        };
        let state = Arc::clone(&self.state);
        Subscription::new(move || {
            lock(&state).listeners.remove(&id);
        })
    }
}
