//! ScriptedPicker - 台本どおりに応答するピッカー（テスト用）

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::fault::{FaultInjector, FaultPoint};
use super::lock;
use crate::domain::{BackendError, LocalImage, Permission, PickOptions, PickResult};
use crate::ports::MediaPicker;

/// Answers permission requests with a fixed value and pick requests from a
/// queue. An empty queue behaves like the user closing the picker.
pub struct ScriptedPicker {
    permission: Permission,
    picks: Mutex<VecDeque<PickResult>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    last_options: Mutex<Option<PickOptions>>,
    permission_requests: AtomicUsize,
    pick_calls: AtomicUsize,
    faults: FaultInjector,
}

impl ScriptedPicker {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            picks: Mutex::new(VecDeque::new()),
            contents: Mutex::new(HashMap::new()),
            last_options: Mutex::new(None),
            permission_requests: AtomicUsize::new(0),
            pick_calls: AtomicUsize::new(0),
            faults: FaultInjector::new(),
        }
    }

    pub fn granted() -> Self {
        Self::new(Permission::Granted)
    }

    pub fn denied() -> Self {
        Self::new(Permission::Denied)
    }

    /// Queue a successful pick of `image` whose content is `bytes`.
    pub fn push_image(&self, image: LocalImage, bytes: Vec<u8>) {
        lock(&self.contents).insert(image.uri.clone(), bytes);
        lock(&self.picks).push_back(PickResult::Picked(image));
    }

    pub fn push_cancel(&self) {
        lock(&self.picks).push_back(PickResult::Cancelled);
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub fn pick_calls(&self) -> usize {
        self.pick_calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<PickOptions> {
        lock(&self.last_options).clone()
    }

    fn check(&self, point: FaultPoint) -> Result<(), BackendError> {
        match self.faults.check(point) {
            Some(message) => Err(BackendError::picker(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MediaPicker for ScriptedPicker {
    async fn request_permission(&self) -> Result<Permission, BackendError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        self.check(FaultPoint::Permission)?;
        Ok(self.permission)
    }

    async fn pick_image(&self, options: &PickOptions) -> Result<PickResult, BackendError> {
        self.pick_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FaultPoint::Pick)?;
        *lock(&self.last_options) = Some(options.clone());
        Ok(lock(&self.picks).pop_front().unwrap_or(PickResult::Cancelled))
    }

    async fn read(&self, image: &LocalImage) -> Result<Vec<u8>, BackendError> {
        self.check(FaultPoint::Read)?;
        lock(&self.contents)
            .get(&image.uri)
            .cloned()
            .ok_or_else(|| BackendError::picker(format!("cannot read {}", image.uri)))
    }
}
