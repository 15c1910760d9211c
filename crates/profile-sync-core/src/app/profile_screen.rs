//! ProfileScreen - view state behind the profile page.
//!
//! # 学習ポイント
//! - 結果を反映する前に `PrincipalContext` が今も current かを確認する
//!   （古い principal 向けの結果は捨てて `StaleResultDiscarded` を出す）
//! - 画像の変更中は `UploadingGuard` が `loading` を立て、どの経路で戻っても下ろす
//! - `follow` はセッションの watch を購読するループを spawn する。
//!   停止は worker group と同じく `watch::Sender<bool>` で伝える

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{
    AvatarRef, DomainEvent, PendingLink, PrincipalContext, PrincipalId, SessionSnapshot, SyncError,
    UploadOutcome, UploadReport,
};
use crate::impls::lock;
use crate::ports::EventSink;

use super::notice::UserNotice;
use super::profile_sync::ProfileSync;
use super::session::SessionProvider;

/// What the profile page renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileView {
    pub principal_id: Option<PrincipalId>,
    pub avatar: Option<AvatarRef>,
    pub loading: bool,
    /// Left behind by an attempt that stored the object but could not link it.
    pub pending_link: Option<PendingLink>,
    /// Session generation the view was last bound to.
    pub bound_generation: u64,
}

pub struct ProfileScreen {
    session: Arc<SessionProvider>,
    sync: Arc<ProfileSync>,
    events: Arc<dyn EventSink>,
    view: Mutex<ProfileView>,
    /// Avatar changes currently running through this screen.
    uploads: AtomicUsize,
}

/// Keeps `ProfileView::loading` raised while an avatar change runs.
struct UploadingGuard<'a> {
    screen: &'a ProfileScreen,
}

impl<'a> UploadingGuard<'a> {
    fn raise(screen: &'a ProfileScreen) -> Self {
        screen.uploads.fetch_add(1, Ordering::SeqCst);
        lock(&screen.view).loading = true;
        Self { screen }
    }
}

impl Drop for UploadingGuard<'_> {
    fn drop(&mut self) {
        if self.screen.uploads.fetch_sub(1, Ordering::SeqCst) == 1 {
            lock(&self.screen.view).loading = false;
        }
    }
}

impl ProfileScreen {
    pub fn new(
        session: Arc<SessionProvider>,
        sync: Arc<ProfileSync>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            session,
            sync,
            events,
            view: Mutex::new(ProfileView::default()),
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn view(&self) -> ProfileView {
        lock(&self.view).clone()
    }

    /// Reload the avatar for the current principal.
    ///
    /// With no principal the view is cleared and nothing is fetched.
    pub async fn refresh(&self) {
        let Some(ctx) = self.session.context() else {
            let generation = self.session.snapshot().generation;
            *lock(&self.view) = ProfileView {
                bound_generation: generation,
                ..ProfileView::default()
            };
            return;
        };

        {
            let mut view = lock(&self.view);
            if view.bound_generation != ctx.generation() {
                *view = ProfileView::default();
            }
            view.principal_id = Some(ctx.principal_id().clone());
            view.bound_generation = ctx.generation();
            view.loading = true;
        }

        // エラーは fetch_avatar 側でログ済み。画面は「アバターなし」に戻す
        let avatar = self.sync.fetch_avatar(&ctx).await.unwrap_or(None);

        let mut view = lock(&self.view);
        if !self.session.is_current(&ctx) {
            self.discard(&ctx);
            if view.bound_generation == ctx.generation() {
                *view = ProfileView {
                    bound_generation: ctx.generation(),
                    ..ProfileView::default()
                };
            }
            return;
        }
        view.avatar = avatar;
        view.loading = self.uploads.load(Ordering::SeqCst) > 0;
    }

    /// Run the whole pick → upload → link flow for the current principal.
    pub async fn change_picture(&self) -> Option<UserNotice> {
        let Some(ctx) = self.session.context() else {
            tracing::debug!("change_picture without a principal, ignoring");
            return None;
        };
        let _uploading = UploadingGuard::raise(self);
        let result = self.sync.pick_and_upload(&ctx).await;
        self.apply(&ctx, result)
    }

    /// Retry the link phase of the last attempt that ended in `LinkFailed`.
    pub async fn retry_link(&self) -> Option<UserNotice> {
        let ctx = self.session.context()?;
        let pending = lock(&self.view).pending_link.clone()?;
        let _uploading = UploadingGuard::raise(self);
        let result = self.sync.retry_link(&ctx, pending).await;
        self.apply(&ctx, result)
    }

    fn apply(
        &self,
        ctx: &PrincipalContext,
        result: Result<UploadReport, SyncError>,
    ) -> Option<UserNotice> {
        let report = match result {
            Ok(report) => report,
            Err(SyncError::UploadInFlight(_)) => return Some(UserNotice::upload_in_progress()),
            Err(err) => {
                tracing::warn!(principal = %ctx.principal_id(), error = %err, "avatar change refused");
                return Some(UserNotice::upload_error());
            }
        };

        if !self.session.is_current(ctx) {
            self.discard(ctx);
            return None;
        }

        {
            let mut view = lock(&self.view);
            match &report.outcome {
                UploadOutcome::Linked(avatar) => {
                    view.avatar = Some(avatar.clone());
                    view.pending_link = None;
                }
                UploadOutcome::LinkFailed(_) => {
                    view.pending_link = report.pending_link().cloned();
                }
                _ => {}
            }
        }
        UserNotice::for_upload(&report)
    }

    fn discard(&self, ctx: &PrincipalContext) {
        tracing::debug!(
            principal = %ctx.principal_id(),
            generation = ctx.generation(),
            "discarding result for a stale principal"
        );
        self.events.emit(&DomainEvent::StaleResultDiscarded {
            principal_id: ctx.principal_id().clone(),
            generation: ctx.generation(),
        });
    }

    /// Refresh now and again whenever the session generation moves, until
    /// the returned handle is shut down.
    pub fn follow(self: &Arc<Self>) -> FollowHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let screen = Arc::clone(self);
        let session_rx = self.session.watch();
        let join = tokio::spawn(async move {
            follow_loop(screen, session_rx, shutdown_rx).await;
        });
        FollowHandle { shutdown_tx, join }
    }
}

async fn follow_loop(
    screen: Arc<ProfileScreen>,
    mut session_rx: watch::Receiver<SessionSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut seen = session_rx.borrow_and_update().generation;
    screen.refresh().await;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            res = shutdown_rx.changed() => {
                if res.is_err() {
                    // FollowHandle が drop された
                    break;
                }
                continue;
            }
            changed = session_rx.changed() => {
                if changed.is_err() {
                    // SessionProvider が drop された
                    break;
                }
            }
        }

        let generation = session_rx.borrow_and_update().generation;
        if generation != seen {
            seen = generation;
            screen.refresh().await;
        }
    }
    tracing::debug!("profile screen follower stopped");
}

/// Handle to a running `follow` loop.
/// - `shutdown_tx` を drop してもループは止まる
pub struct FollowHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl FollowHandle {
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}
