//! End-to-end workflow checks against the in-memory backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use profile_sync_core::app::{App, AppBuilder, NoticeLevel};
use profile_sync_core::config::SyncConfig;
use profile_sync_core::domain::{
    AvatarPathStrategy, AvatarRef, Credentials, LocalImage, PrincipalContext, SyncError,
    UploadState,
};
use profile_sync_core::impls::{FaultPoint, InMemoryBackend, RecordingEventSink, ScriptedPicker};
use profile_sync_core::observability::UploadCounts;
use profile_sync_core::ports::{AuthProvider, Clock, EqFilter, ObjectStorage};

/// Moves one second forward on every read.
struct TickingClock {
    secs: AtomicI64,
}

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.secs.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0).unwrap()
    }
}

struct Harness {
    backend: InMemoryBackend,
    picker: Arc<ScriptedPicker>,
    events: Arc<RecordingEventSink>,
    app: App,
}

async fn harness_with(builder: AppBuilder, picker: ScriptedPicker) -> Harness {
    let backend = InMemoryBackend::new(false);
    let picker = Arc::new(picker);
    let events = Arc::new(RecordingEventSink::new());
    let app = builder
        .backend(&backend)
        .picker(picker.clone())
        .event_sink(events.clone())
        .build()
        .await
        .unwrap();
    Harness {
        backend,
        picker,
        events,
        app,
    }
}

async fn harness() -> Harness {
    harness_with(
        AppBuilder::new().config(SyncConfig::new("auth_uid")),
        ScriptedPicker::granted(),
    )
    .await
}

fn creds(email: &str) -> Credentials {
    Credentials::new(email, "secret").unwrap()
}

async fn signed_in(h: &Harness, email: &str) -> PrincipalContext {
    h.app.accounts.sign_up(&creds(email)).await.unwrap();
    h.app.session.context().unwrap()
}

fn photo(name: &str) -> LocalImage {
    LocalImage::new(format!("file:///photos/{name}"))
        .with_file_name(name)
        .with_mime_type("image/jpeg")
}

fn avatar_column(h: &Harness, ctx: &PrincipalContext) -> serde_json::Value {
    let filter = EqFilter::new("auth_uid", ctx.principal_id().as_str());
    h.backend
        .records
        .rows("profiles")
        .into_iter()
        .find(|row| filter.matches(row))
        .map(|row| row["avatar_url"].clone())
        .unwrap()
}

fn object_path(avatar: &AvatarRef) -> String {
    avatar
        .as_url()
        .path()
        .trim_start_matches("/storage/v1/object/public/avatars/")
        .to_string()
}

#[tokio::test]
async fn session_tracks_the_latest_notification() {
    let h = harness().await;
    assert_eq!(h.app.session.principal(), None);

    let a = h.app.accounts.sign_up(&creds("a@example.com")).await.unwrap().principal;
    assert_eq!(h.app.session.principal(), Some(a.clone()));

    h.backend.auth.refresh_token();
    assert_eq!(h.app.session.principal(), Some(a));

    h.app.sign_out().await.unwrap();
    assert_eq!(h.app.session.principal(), None);

    let b = h.app.accounts.sign_up(&creds("b@example.com")).await.unwrap().principal;
    assert_eq!(h.app.session.principal(), Some(b.clone()));
    assert_eq!(h.backend.auth.current_session().await.unwrap(), Some(b));

    h.app.shutdown();
    assert_eq!(h.backend.auth.listener_count(), 0);
}

#[tokio::test]
async fn upload_then_fetch_returns_the_linked_reference() {
    let h = harness().await;
    let ctx = signed_in(&h, "a@example.com").await;

    h.picker.push_image(photo("me.jpg"), b"jpeg-bytes".to_vec());
    let linked = h
        .app
        .sync
        .pick_and_upload(&ctx)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(h.app.sync.fetch_avatar(&ctx).await.unwrap(), Some(linked.clone()));
    assert_eq!(
        h.backend
            .storage
            .download("avatars", &object_path(&linked))
            .await
            .unwrap(),
        b"jpeg-bytes".to_vec()
    );
}

#[tokio::test]
async fn same_image_twice_yields_identical_content() {
    let builder = AppBuilder::new()
        .config(SyncConfig::new("auth_uid").with_path_strategy(AvatarPathStrategy::Timestamped))
        .clock(Arc::new(TickingClock {
            secs: AtomicI64::new(1_700_000_000),
        }));
    let h = harness_with(builder, ScriptedPicker::granted()).await;
    let ctx = signed_in(&h, "a@example.com").await;
    let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

    h.picker.push_image(photo("me.jpg"), bytes.clone());
    h.picker.push_image(photo("me.jpg"), bytes.clone());
    let first = h.app.sync.pick_and_upload(&ctx).await.unwrap().into_result().unwrap();
    let second = h.app.sync.pick_and_upload(&ctx).await.unwrap().into_result().unwrap();
    assert_ne!(first, second);

    let storage = &h.backend.storage;
    let a = storage.download("avatars", &object_path(&first)).await.unwrap();
    let b = storage.download("avatars", &object_path(&second)).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a, bytes);
    assert_eq!(h.app.sync.fetch_avatar(&ctx).await.unwrap(), Some(second));
}

#[tokio::test]
async fn linked_reference_names_the_stored_object_for_reserved_characters() {
    let builder = AppBuilder::new()
        .config(SyncConfig::new("auth_uid").with_path_strategy(AvatarPathStrategy::Timestamped));
    let h = harness_with(builder, ScriptedPicker::granted()).await;
    let ctx = signed_in(&h, "a@example.com").await;

    h.picker.push_image(photo("me#2?.jpg"), b"hash".to_vec());
    let report = h.app.sync.pick_and_upload(&ctx).await.unwrap();
    assert_eq!(report.terminal(), UploadState::Linked);

    let linked = report.into_result().unwrap();
    assert_eq!(linked.as_url().fragment(), None);
    assert_eq!(linked.as_url().query(), None);
    assert_eq!(
        h.backend
            .storage
            .download("avatars", &object_path(&linked))
            .await
            .unwrap(),
        b"hash".to_vec()
    );
}

#[tokio::test]
async fn permission_denied_never_uploads() {
    let h = harness_with(
        AppBuilder::new().config(SyncConfig::new("auth_uid")),
        ScriptedPicker::denied(),
    )
    .await;
    let ctx = signed_in(&h, "a@example.com").await;

    let report = h.app.sync.pick_and_upload(&ctx).await.unwrap();
    assert_eq!(report.terminal(), UploadState::PermissionDenied);
    assert!(!report.reached(UploadState::Uploading));
    assert_eq!(h.picker.pick_calls(), 0);
    assert_eq!(h.backend.storage.bytes_received(), 0);
    assert_eq!(h.backend.storage.object_count(), 0);
    assert_eq!(avatar_column(&h, &ctx), serde_json::Value::Null);

    let screen = h.app.profile_screen();
    let notice = screen.change_picture().await.unwrap();
    assert_eq!(notice.title, "Permission needed");
}

#[tokio::test]
async fn link_failure_leaves_object_retrievable_and_record_unchanged() {
    let h = harness().await;
    let ctx = signed_in(&h, "a@example.com").await;

    // an earlier avatar that must survive the failed link
    h.picker.push_image(photo("old.jpg"), b"old".to_vec());
    let old = h.app.sync.pick_and_upload(&ctx).await.unwrap().into_result().unwrap();

    h.picker.push_image(photo("new.jpg"), b"new".to_vec());
    h.backend
        .records
        .faults()
        .fail_next(FaultPoint::Update, "connection reset");
    let report = h.app.sync.pick_and_upload(&ctx).await.unwrap();

    assert_eq!(report.terminal(), UploadState::LinkFailed);
    assert!(report.reached(UploadState::Uploaded));
    let err = report.clone().into_result().unwrap_err();
    assert!(err.is_partial_upload());

    let pending = report.pending_link().cloned().unwrap();
    assert_eq!(
        h.backend
            .storage
            .download(&pending.bucket, &pending.path)
            .await
            .unwrap(),
        b"new".to_vec()
    );
    assert_eq!(h.app.sync.fetch_avatar(&ctx).await.unwrap(), Some(old));

    let retried = h.app.sync.retry_link(&ctx, pending).await.unwrap();
    assert!(retried.is_success());
    assert_eq!(
        avatar_column(&h, &ctx),
        serde_json::Value::String(retried.avatar().unwrap().to_string())
    );
}

#[tokio::test]
async fn concurrent_upload_for_same_principal_is_rejected() {
    let h = harness().await;
    let ctx = signed_in(&h, "a@example.com").await;
    let gate = h.backend.storage.hold_next_upload();

    h.picker.push_image(photo("one.jpg"), b"one".to_vec());
    let first = tokio::spawn({
        let sync = Arc::clone(&h.app.sync);
        let ctx = ctx.clone();
        async move { sync.pick_and_upload(&ctx).await }
    });
    gate.entered().await;

    h.picker.push_image(photo("two.jpg"), b"two".to_vec());
    let second = h.app.sync.pick_and_upload(&ctx).await;
    assert_eq!(
        second.err(),
        Some(SyncError::UploadInFlight(ctx.principal_id().clone()))
    );

    let screen = h.app.profile_screen();
    let notice = screen.change_picture().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);

    gate.release();
    assert!(first.await.unwrap().unwrap().is_success());
    // the rejected attempts never touched the picker queue
    assert_eq!(h.picker.pick_calls(), 1);
}

#[tokio::test]
async fn sign_up_creates_exactly_one_profile_before_reporting() {
    let h = harness().await;
    let form = h.app.auth_form();
    form.toggle_mode();
    form.set_email("  new@example.com ");
    form.set_password("secret");

    let notice = form.submit().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);

    let principal = h.app.session.principal().unwrap();
    let filter = EqFilter::new("auth_uid", principal.id.as_str());
    assert_eq!(h.backend.records.count_matching("profiles", &filter), 1);

    // a second sign-up for the same email is refused verbatim and adds nothing
    let notice = form.submit().await.unwrap();
    assert_eq!(notice.message, "User already registered");
    assert_eq!(h.backend.records.rows("profiles").len(), 1);

    let counts = UploadCounts::from_events(&h.events.events());
    assert_eq!(counts.total(), 0);
}
