//! ProfileSync - avatar fetch and the pick → upload → link workflow.
//!
//! Upload and link are two independent external writes. When the object is
//! stored but the profile row could not be pointed at it, the attempt ends in
//! `LinkFailed` carrying a `PendingLink`; `retry_link` finishes only that
//! second phase. Nothing is rolled back.
//!
//! At most one attempt per principal runs at a time. A second request while
//! one is in flight is rejected with `SyncError::UploadInFlight`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::domain::{
    AvatarPathStrategy, AvatarRef, DomainEvent, LocalImage, PendingLink, Permission, PickOptions,
    PickResult, PrincipalContext, PrincipalId, SyncError, UploadAttempt, UploadOutcome,
    UploadReport, UploadState,
};
use crate::impls::lock;
use crate::ports::{Clock, EventSink, IdGenerator, MediaPicker, ObjectStorage, UploadOptions};

use super::profiles::ProfileRepository;

/// Releases the per-principal slot when the attempt ends.
struct InFlightGuard {
    slots: Arc<Mutex<HashSet<PrincipalId>>>,
    principal: PrincipalId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.slots).remove(&self.principal);
    }
}

pub struct ProfileSync {
    profiles: ProfileRepository,
    storage: Arc<dyn ObjectStorage>,
    picker: Arc<dyn MediaPicker>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    bucket: String,
    path_strategy: AvatarPathStrategy,
    pick_options: PickOptions,
    in_flight: Arc<Mutex<HashSet<PrincipalId>>>,
}

impl ProfileSync {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: ProfileRepository,
        storage: Arc<dyn ObjectStorage>,
        picker: Arc<dyn MediaPicker>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
        bucket: impl Into<String>,
        path_strategy: AvatarPathStrategy,
        pick_options: PickOptions,
    ) -> Self {
        Self {
            profiles,
            storage,
            picker,
            ids,
            clock,
            events,
            bucket: bucket.into(),
            path_strategy,
            pick_options,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn is_uploading(&self, principal: &PrincipalId) -> bool {
        lock(&self.in_flight).contains(principal)
    }

    /// Avatar reference currently stored for the context's principal.
    ///
    /// Lookup failures are logged here; callers fall back to "no avatar".
    pub async fn fetch_avatar(
        &self,
        ctx: &PrincipalContext,
    ) -> Result<Option<AvatarRef>, SyncError> {
        let result = self.profiles.fetch_avatar(ctx.principal_id()).await;
        if let Err(err) = &result {
            tracing::warn!(principal = %ctx.principal_id(), error = %err, "error fetching profile");
        }
        result
    }

    /// Ask for media permission, then let the user choose an image.
    pub async fn pick_image(&self) -> Result<LocalImage, SyncError> {
        match self.picker.request_permission().await? {
            Permission::Granted => {}
            Permission::Denied => return Err(SyncError::PermissionDenied),
        }
        match self.picker.pick_image(&self.pick_options).await? {
            PickResult::Picked(image) => Ok(image),
            PickResult::Cancelled => Err(SyncError::Cancelled),
        }
    }

    /// Full workflow starting from `Idle`.
    ///
    /// `Err` only when the attempt was refused before it started.
    pub async fn pick_and_upload(&self, ctx: &PrincipalContext) -> Result<UploadReport, SyncError> {
        let _slot = self.claim(ctx.principal_id())?;
        let mut attempt = self.start(ctx);

        self.step(&mut attempt, UploadState::Picking);
        let image = match self.pick_image().await {
            Ok(image) => image,
            Err(SyncError::PermissionDenied) => {
                self.step(&mut attempt, UploadState::PermissionDenied);
                return Ok(attempt.finish(UploadOutcome::PermissionDenied));
            }
            Err(SyncError::Cancelled) => {
                self.step(&mut attempt, UploadState::Cancelled);
                return Ok(attempt.finish(UploadOutcome::Cancelled));
            }
            Err(err) => {
                // ピッカー自体の失敗は「画像が得られなかった」として扱う
                tracing::warn!(attempt = %attempt.attempt_id, error = %err, "image picker failed");
                self.step(&mut attempt, UploadState::Cancelled);
                return Ok(attempt.finish(UploadOutcome::Cancelled));
            }
        };
        self.step(&mut attempt, UploadState::Picked);
        Ok(self.upload_picked(attempt, image).await)
    }

    /// Workflow for an image that was already picked.
    pub async fn upload_avatar(
        &self,
        ctx: &PrincipalContext,
        image: LocalImage,
    ) -> Result<UploadReport, SyncError> {
        let _slot = self.claim(ctx.principal_id())?;
        let mut attempt = self.start(ctx);
        self.step(&mut attempt, UploadState::Picked);
        Ok(self.upload_picked(attempt, image).await)
    }

    /// Re-run only the link phase of an attempt that ended in `LinkFailed`.
    pub async fn retry_link(
        &self,
        ctx: &PrincipalContext,
        pending: PendingLink,
    ) -> Result<UploadReport, SyncError> {
        if pending.principal_id != *ctx.principal_id() {
            return Err(SyncError::InvalidInput(format!(
                "pending link belongs to {}, not {}",
                pending.principal_id,
                ctx.principal_id()
            )));
        }
        let _slot = self.claim(ctx.principal_id())?;
        let attempt = UploadAttempt::resume(&pending);
        tracing::info!(attempt = %pending.attempt_id, path = %pending.path, "retrying avatar link");
        Ok(self.link(attempt, pending).await)
    }

    fn claim(&self, principal: &PrincipalId) -> Result<InFlightGuard, SyncError> {
        if !lock(&self.in_flight).insert(principal.clone()) {
            tracing::info!(%principal, "upload already in flight, rejecting");
            return Err(SyncError::UploadInFlight(principal.clone()));
        }
        Ok(InFlightGuard {
            slots: Arc::clone(&self.in_flight),
            principal: principal.clone(),
        })
    }

    fn start(&self, ctx: &PrincipalContext) -> UploadAttempt {
        UploadAttempt::new(self.ids.generate_attempt_id(), ctx.principal_id().clone())
    }

    fn step(&self, attempt: &mut UploadAttempt, next: UploadState) {
        match attempt.advance(next) {
            Ok(from) => self.events.emit(&DomainEvent::UploadTransition {
                attempt_id: attempt.attempt_id,
                principal_id: attempt.principal_id.clone(),
                from,
                to: next,
            }),
            Err(err) => {
                tracing::error!(attempt = %attempt.attempt_id, error = %err, "upload state machine violated");
                debug_assert!(false, "{err}");
            }
        }
    }

    async fn upload_picked(&self, mut attempt: UploadAttempt, image: LocalImage) -> UploadReport {
        self.step(&mut attempt, UploadState::Uploading);

        let path = self
            .path_strategy
            .object_path(&attempt.principal_id, &image, self.clock.now());

        let bytes = match self.picker.read(&image).await {
            Ok(bytes) => bytes,
            Err(err) => return self.upload_failed(attempt, err.into()),
        };
        let options = UploadOptions {
            upsert: true,
            content_type: image.mime_type.clone(),
        };
        let size = bytes.len();
        if let Err(err) = self
            .storage
            .upload(&self.bucket, &path, bytes, &options)
            .await
        {
            return self.upload_failed(attempt, err.into());
        }
        tracing::debug!(attempt = %attempt.attempt_id, %path, size, "avatar object stored");
        self.step(&mut attempt, UploadState::Uploaded);

        let pending = PendingLink {
            attempt_id: attempt.attempt_id,
            principal_id: attempt.principal_id.clone(),
            bucket: self.bucket.clone(),
            path,
            public_ref: None,
        };
        self.link(attempt, pending).await
    }

    async fn link(&self, mut attempt: UploadAttempt, mut pending: PendingLink) -> UploadReport {
        self.step(&mut attempt, UploadState::Linking);

        let avatar = match pending.public_ref.clone() {
            Some(avatar) => avatar,
            None => match self.storage.public_url(&pending.bucket, &pending.path).await {
                Ok(url) => {
                    let avatar = AvatarRef::from(url);
                    pending.public_ref = Some(avatar.clone());
                    avatar
                }
                Err(err) => return self.link_failed(attempt, pending, err.into()),
            },
        };

        if let Err(err) = self
            .profiles
            .link_avatar(&pending.principal_id, &avatar)
            .await
        {
            return self.link_failed(attempt, pending, err);
        }

        self.step(&mut attempt, UploadState::Linked);
        tracing::info!(attempt = %attempt.attempt_id, %avatar, "avatar linked");
        attempt.finish(UploadOutcome::Linked(avatar))
    }

    fn upload_failed(&self, mut attempt: UploadAttempt, err: SyncError) -> UploadReport {
        tracing::warn!(attempt = %attempt.attempt_id, error = %err, "upload error");
        self.step(&mut attempt, UploadState::UploadFailed);
        attempt.finish(UploadOutcome::UploadFailed(err))
    }

    fn link_failed(
        &self,
        mut attempt: UploadAttempt,
        pending: PendingLink,
        err: SyncError,
    ) -> UploadReport {
        tracing::warn!(
            attempt = %attempt.attempt_id,
            path = %pending.path,
            error = %err,
            "avatar stored but profile link failed"
        );
        self.step(&mut attempt, UploadState::LinkFailed);
        attempt.finish(UploadOutcome::LinkFailed(SyncError::PartialUpload {
            pending: Box::new(pending),
            source: Box::new(err),
        }))
    }
}
