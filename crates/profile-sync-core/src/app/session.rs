//! SessionProvider - 現在の principal を保持し、変化を通知する
//!
//! # 学習ポイント
//! - auth の購読は `attach` で取得し、`detach` で明示的に解放する
//! - 公開する状態は `tokio::sync::watch` に載せる（UI 側は `watch()` で購読）
//! - 購読と初回問い合わせの競合: 問い合わせ中に通知が来たら、通知の方が新しい

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::domain::{
    AuthChangeKind, DomainEvent, Principal, PrincipalContext, SessionEvent, SessionSnapshot,
    SyncError,
};
use crate::impls::lock;
use crate::ports::{AuthProvider, EventSink, Subscription};

type Observer = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

/// State shared with the auth listener.
struct Shared {
    state: watch::Sender<SessionSnapshot>,
    /// Number of notifications applied so far. Guarded separately so that
    /// the initial query can tell whether a notification overtook it.
    applied: Mutex<u64>,
    observers: Mutex<HashMap<u64, Observer>>,
    next_observer_id: Mutex<u64>,
    events: Arc<dyn EventSink>,
}

impl Shared {
    /// Apply a notification. Caller holds the `applied` lock and runs the
    /// observers with [`Shared::notify_observers`] after releasing it.
    fn apply_locked(&self, event: &SessionEvent) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::default();
        self.state.send_modify(|current| {
            let same_principal = current.principal.as_ref().map(|p| &p.id)
                == event.principal.as_ref().map(|p| &p.id);
            if !same_principal {
                current.generation += 1;
            }
            current.principal = event.principal.clone();
            snapshot = current.clone();
        });

        self.events.emit(&DomainEvent::SessionChanged {
            kind: event.kind,
            principal_id: snapshot.principal.as_ref().map(|p| p.id.clone()),
            generation: snapshot.generation,
        });
        snapshot
    }

    /// No lock is held here, so an observer may trigger another notification.
    fn notify_observers(&self, snapshot: &SessionSnapshot) {
        let observers: Vec<Observer> = lock(&self.observers).values().cloned().collect();
        for observer in observers {
            observer(snapshot);
        }
    }

    fn on_notification(&self, event: &SessionEvent) {
        let snapshot = {
            let mut applied = lock(&self.applied);
            *applied += 1;
            self.apply_locked(event)
        };
        self.notify_observers(&snapshot);
    }
}

/// Tracks the current principal for the UI.
pub struct SessionProvider {
    auth: Arc<dyn AuthProvider>,
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionProvider {
    /// Subscribe to session changes and load the persisted session once.
    pub async fn attach(
        auth: Arc<dyn AuthProvider>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, SyncError> {
        let (state, _) = watch::channel(SessionSnapshot::default());
        let shared = Arc::new(Shared {
            state,
            applied: Mutex::new(0),
            observers: Mutex::new(HashMap::new()),
            next_observer_id: Mutex::new(0),
            events,
        });

        // 先に購読してから問い合わせる（取りこぼし防止）
        let subscription = auth.subscribe(Arc::new({
            let shared = Arc::clone(&shared);
            move |event: &SessionEvent| shared.on_notification(event)
        }));

        let provider = Self {
            auth,
            shared,
            subscription: Mutex::new(Some(subscription)),
        };
        if let Err(err) = provider.current_principal().await {
            provider.detach();
            return Err(err);
        }
        Ok(provider)
    }

    /// Ask the auth service for its persisted session and publish it.
    ///
    /// If a notification arrives while the query is in flight, the
    /// notification wins and the query result is dropped.
    pub async fn current_principal(&self) -> Result<Option<Principal>, SyncError> {
        let before = *lock(&self.shared.applied);
        let principal = self.auth.current_session().await?;

        let snapshot = {
            let applied = lock(&self.shared.applied);
            if *applied != before {
                tracing::debug!("session notification overtook current_session query");
                return Ok(self.snapshot().principal);
            }
            self.shared.apply_locked(&SessionEvent {
                kind: AuthChangeKind::InitialSession,
                principal: principal.clone(),
            })
        };
        self.shared.notify_observers(&snapshot);
        Ok(principal)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Cached principal, without a round trip.
    pub fn principal(&self) -> Option<Principal> {
        self.shared.state.borrow().principal.clone()
    }

    /// Context for profile operations on the current principal.
    pub fn context(&self) -> Option<PrincipalContext> {
        self.shared.state.borrow().context()
    }

    pub fn is_current(&self, ctx: &PrincipalContext) -> bool {
        ctx.is_current(&self.shared.state.borrow())
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.state.subscribe()
    }

    /// Run `callback` after every applied session change.
    pub fn on_principal_change(
        &self,
        callback: impl Fn(&SessionSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        let id = {
            let mut next = lock(&self.shared.next_observer_id);
            *next += 1;
            *next
        };
        lock(&self.shared.observers).insert(id, Arc::new(callback));

        let shared = Arc::clone(&self.shared);
        Subscription::new(move || {
            lock(&shared.observers).remove(&id);
        })
    }

    /// Release the auth subscription. Later notifications are ignored.
    pub fn detach(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.subscription).is_some()
    }
}
