//! InMemoryObjectStorage - 開発用のオブジェクトストレージ
//!
//! # 学習ポイント
//! - `UploadGate` で 1 回分の upload を途中で止め、in-flight 状態をテストから作る
//! - 公開 URL は `{base}/storage/v1/object/public/{bucket}/{path}` で組み立てる
//!   （オブジェクトの有無は確認しない。各セグメントは percent-encode される）

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use super::fault::{FaultInjector, FaultPoint};
use super::lock;
use crate::domain::BackendError;
use crate::ports::{ObjectStorage, UploadOptions};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// Holds one upload in flight until released.
#[derive(Debug, Default)]
pub struct UploadGate {
    entered: Notify,
    release: Notify,
}

impl UploadGate {
    /// Wait until the held upload has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held upload continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:54321";

pub struct InMemoryObjectStorage {
    base_url: String,
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    bytes_received: AtomicU64,
    gate: Mutex<Option<Arc<UploadGate>>>,
    faults: FaultInjector,
}

impl InMemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
            bytes_received: AtomicU64::new(0),
            gate: Mutex::new(None),
            faults: FaultInjector::new(),
        }
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Total bytes accepted by `upload` so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn content_type(&self, bucket: &str, path: &str) -> Option<String> {
        lock(&self.objects)
            .get(&(bucket.to_string(), path.to_string()))
            .and_then(|o| o.content_type.clone())
    }

    /// The next `upload` call parks until the returned gate is released.
    pub fn hold_next_upload(&self) -> Arc<UploadGate> {
        let gate = Arc::new(UploadGate::default());
        *lock(&self.gate) = Some(Arc::clone(&gate));
        gate
    }

    fn check(&self, point: FaultPoint) -> Result<(), BackendError> {
        match self.faults.check(point) {
            Some(message) => Err(BackendError::storage(message)),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), BackendError> {
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.check(FaultPoint::Upload)?;

        let key = (bucket.to_string(), path.to_string());
        let len = bytes.len() as u64;
        {
            let mut objects = lock(&self.objects);
            if !options.upsert && objects.contains_key(&key) {
                return Err(BackendError::storage("The resource already exists"));
            }
            objects.insert(
                key,
                StoredObject {
                    bytes,
                    content_type: options.content_type.clone(),
                },
            );
        }
        self.bytes_received.fetch_add(len, Ordering::SeqCst);
        Ok(())
    }

    async fn public_url(&self, bucket: &str, path: &str) -> Result<Url, BackendError> {
        self.check(FaultPoint::PublicUrl)?;
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BackendError::storage(format!("invalid base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::storage("base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", "public", bucket])
            .extend(path.split('/'));
        Ok(url)
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, BackendError> {
        self.check(FaultPoint::Download)?;
        lock(&self.objects)
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| BackendError::storage("Object not found"))
    }
}
