//! AppBuilder - ports とコンフィグからアプリケーションを組み立てる
//!
//! # 学習ポイント
//! - Builder パターン
//! - 起動時検証（Fail-fast）: 足りない port は一度にまとめて報告する
//! - 省略可能な port（EventSink / Clock / IdGenerator）は既定実装で埋める

use std::sync::Arc;

use crate::config::{ConfigError, SyncConfig};
use crate::domain::SyncError;
use crate::impls::{InMemoryBackend, TracingEventSink};
use crate::ports::{
    AuthProvider, Clock, EventSink, IdGenerator, MediaPicker, ObjectStorage, RecordStore,
    SystemClock, UlidGenerator,
};

use super::accounts::Accounts;
use super::auth_form::AuthForm;
use super::profile_screen::ProfileScreen;
use super::profile_sync::ProfileSync;
use super::profiles::ProfileRepository;
use super::session::SessionProvider;

/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .config(SyncConfig::new("auth_uid"))
///     .backend(&backend)
///     .picker(picker)
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    config: Option<SyncConfig>,
    auth: Option<Arc<dyn AuthProvider>>,
    records: Option<Arc<dyn RecordStore>>,
    storage: Option<Arc<dyn ObjectStorage>>,
    picker: Option<Arc<dyn MediaPicker>>,
    events: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These must be provided before build().")]
    MissingPorts(Vec<&'static str>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not load the initial session: {0}")]
    Session(#[source] SyncError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// auth / records / storage をまとめて設定
    pub fn backend(self, backend: &InMemoryBackend) -> Self {
        self.auth(backend.auth.clone())
            .records(backend.records.clone())
            .storage(backend.storage.clone())
    }

    pub fn picker(mut self, picker: Arc<dyn MediaPicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Validate, wire the components, and attach the session provider.
    pub async fn build(self) -> Result<App, BuildError> {
        let mut missing = Vec::new();
        if self.config.is_none() {
            missing.push("config");
        }
        if self.auth.is_none() {
            missing.push("auth");
        }
        if self.records.is_none() {
            missing.push("records");
        }
        if self.storage.is_none() {
            missing.push("storage");
        }
        if self.picker.is_none() {
            missing.push("picker");
        }
        let (Some(config), Some(auth), Some(records), Some(storage), Some(picker)) = (
            self.config,
            self.auth,
            self.records,
            self.storage,
            self.picker,
        ) else {
            return Err(BuildError::MissingPorts(missing));
        };
        config.validate()?;

        let events: Arc<dyn EventSink> = self.events.unwrap_or_else(|| Arc::new(TracingEventSink));
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));

        let profiles = ProfileRepository::new(records, config.schema.clone());
        let session = SessionProvider::attach(auth.clone(), events.clone())
            .await
            .map_err(BuildError::Session)?;
        let accounts = Accounts::new(auth, profiles.clone(), events.clone());
        let sync = ProfileSync::new(
            profiles,
            storage,
            picker,
            ids,
            clock,
            events.clone(),
            config.bucket.clone(),
            config.path_strategy.clone(),
            config.pick_options.clone(),
        );

        tracing::info!(
            bucket = %config.bucket,
            table = %config.schema.table,
            key_column = %config.schema.key_column,
            "profile sync ready"
        );
        Ok(App {
            config,
            session: Arc::new(session),
            accounts: Arc::new(accounts),
            sync: Arc::new(sync),
            events,
        })
    }
}

/// Wired components sharing one session.
pub struct App {
    pub config: SyncConfig,
    pub session: Arc<SessionProvider>,
    pub accounts: Arc<Accounts>,
    pub sync: Arc<ProfileSync>,
    events: Arc<dyn EventSink>,
}

impl App {
    pub fn auth_form(&self) -> AuthForm {
        AuthForm::new(Arc::clone(&self.accounts))
    }

    pub fn profile_screen(&self) -> Arc<ProfileScreen> {
        Arc::new(ProfileScreen::new(
            Arc::clone(&self.session),
            Arc::clone(&self.sync),
            Arc::clone(&self.events),
        ))
    }

    /// Sign the current principal out. The session follows via its listener.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        self.accounts.sign_out().await
    }

    pub fn shutdown(&self) {
        self.session.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{FaultPoint, ScriptedPicker};

    #[tokio::test]
    async fn test_build_success() {
        let backend = InMemoryBackend::new(false);
        let app = AppBuilder::new()
            .config(SyncConfig::new("auth_uid"))
            .backend(&backend)
            .picker(Arc::new(ScriptedPicker::granted()))
            .build()
            .await
            .unwrap();
        assert!(app.session.is_attached());
        assert_eq!(backend.auth.listener_count(), 1);

        app.shutdown();
        assert_eq!(backend.auth.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_build_reports_every_missing_port() {
        let err = AppBuilder::new()
            .auth(Arc::new(crate::impls::InMemoryAuth::default()))
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BuildError::MissingPorts(missing) if missing == vec!["config", "records", "storage", "picker"]
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let mut config = SyncConfig::new("auth_uid");
        config.bucket = String::new();
        let err = AppBuilder::new()
            .config(config)
            .backend(&InMemoryBackend::default())
            .picker(Arc::new(ScriptedPicker::granted()))
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::Config(ConfigError::Invalid { key: "bucket", .. })));
    }

    #[tokio::test]
    async fn test_build_fails_when_session_cannot_load() {
        let backend = InMemoryBackend::default();
        backend
            .auth
            .faults()
            .fail_next(FaultPoint::CurrentSession, "offline");
        let err = AppBuilder::new()
            .config(SyncConfig::new("auth_uid"))
            .backend(&backend)
            .picker(Arc::new(ScriptedPicker::granted()))
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::Session(SyncError::Transport(_))));
        assert_eq!(backend.auth.listener_count(), 0);
    }
}
