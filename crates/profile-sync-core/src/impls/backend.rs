//! InMemoryBackend - the three in-memory services wired together.

use std::sync::Arc;

use super::{InMemoryAuth, InMemoryObjectStorage, InMemoryRecordStore};

/// Shared handles to one in-memory auth/record/storage backend.
///
/// Cloning shares the same services.
#[derive(Clone)]
pub struct InMemoryBackend {
    pub auth: Arc<InMemoryAuth>,
    pub records: Arc<InMemoryRecordStore>,
    pub storage: Arc<InMemoryObjectStorage>,
}

impl InMemoryBackend {
    pub fn new(require_confirmation: bool) -> Self {
        Self {
            auth: Arc::new(InMemoryAuth::new(require_confirmation)),
            records: Arc::new(InMemoryRecordStore::new()),
            storage: Arc::new(InMemoryObjectStorage::default()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(true)
    }
}
