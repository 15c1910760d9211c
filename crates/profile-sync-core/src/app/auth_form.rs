//! AuthForm - state behind the email/password screen.
//!
//! # 学習ポイント
//! - 送信中フラグは `AtomicBool::swap` で取る（二重送信はそのまま無視）
//! - フラグの解除は RAII ガードで行うので、どの経路で抜けても戻る

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{Credentials, SyncError};
use crate::impls::lock;

use super::accounts::Accounts;
use super::notice::UserNotice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        }
    }
}

#[derive(Debug, Default)]
struct Fields {
    email: String,
    password: String,
    mode: AuthMode,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AuthForm {
    accounts: Arc<Accounts>,
    fields: Mutex<Fields>,
    loading: AtomicBool,
}

impl AuthForm {
    pub fn new(accounts: Arc<Accounts>) -> Self {
        Self {
            accounts,
            fields: Mutex::new(Fields::default()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn set_email(&self, email: impl Into<String>) {
        lock(&self.fields).email = email.into();
    }

    pub fn set_password(&self, password: impl Into<String>) {
        lock(&self.fields).password = password.into();
    }

    pub fn mode(&self) -> AuthMode {
        lock(&self.fields).mode
    }

    pub fn toggle_mode(&self) -> AuthMode {
        let mut fields = lock(&self.fields);
        fields.mode = fields.mode.toggled();
        fields.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Submit the form in its current mode.
    ///
    /// Returns the notice to show, if any. A successful sign-in shows
    /// nothing; the session change moves the UI on. While a submission is
    /// running further calls return `None` without doing anything.
    pub async fn submit(&self) -> Option<UserNotice> {
        if self.loading.swap(true, Ordering::SeqCst) {
            tracing::debug!("submit ignored, already loading");
            return None;
        }
        let _loading = LoadingGuard(&self.loading);

        let (email, password, mode) = {
            let fields = lock(&self.fields);
            (fields.email.clone(), fields.password.clone(), fields.mode)
        };
        let credentials = match Credentials::new(&email, &password) {
            Ok(credentials) => credentials,
            Err(err) => return Some(UserNotice::auth_failure(&err)),
        };

        let result: Result<Option<UserNotice>, SyncError> = match mode {
            AuthMode::SignUp => self.accounts.sign_up(&credentials).await.map(|signed_up| {
                Some(if signed_up.confirmation_required {
                    UserNotice::check_email()
                } else {
                    UserNotice::account_created()
                })
            }),
            AuthMode::SignIn => self.accounts.sign_in(&credentials).await.map(|_| None),
        };

        match result {
            Ok(notice) => notice,
            Err(err) => {
                tracing::info!(?mode, error = %err, "authentication failed");
                Some(UserNotice::auth_failure(&err))
            }
        }
    }
}
