//! ProfileRepository - profile rows on top of the record-store port.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{AvatarRef, PrincipalId, ProfileSchema, SyncError};
use crate::ports::{EqFilter, RecordError, RecordStore, Row};

#[derive(Clone)]
pub struct ProfileRepository {
    records: Arc<dyn RecordStore>,
    schema: ProfileSchema,
}

impl ProfileRepository {
    pub fn new(records: Arc<dyn RecordStore>, schema: ProfileSchema) -> Self {
        Self { records, schema }
    }

    pub fn schema(&self) -> &ProfileSchema {
        &self.schema
    }

    fn filter(&self, principal: &PrincipalId) -> EqFilter {
        EqFilter::new(&self.schema.key_column, principal.as_str())
    }

    fn lookup_error(principal: &PrincipalId, err: RecordError) -> SyncError {
        match err {
            RecordError::NotFound => SyncError::NotFound(principal.clone()),
            RecordError::Multiple(count) => SyncError::Ambiguous {
                principal: principal.clone(),
                count,
            },
            RecordError::Backend(e) => SyncError::Transport(e),
        }
    }

    /// Avatar reference of the single row for `principal`.
    pub async fn fetch_avatar(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<AvatarRef>, SyncError> {
        let value = self
            .records
            .select_single(
                &self.schema.table,
                &self.filter(principal),
                &self.schema.avatar_column,
            )
            .await
            .map_err(|e| Self::lookup_error(principal, e))?;

        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => AvatarRef::parse(&s).map(Some),
            other => Err(SyncError::InvalidReference {
                value: other.to_string(),
                reason: "expected a string".to_string(),
            }),
        }
    }

    /// Make sure exactly one row exists for `principal`. Returns `true` when
    /// a row was inserted.
    pub async fn create_stub(&self, principal: &PrincipalId) -> Result<bool, SyncError> {
        match self
            .records
            .select_single(
                &self.schema.table,
                &self.filter(principal),
                &self.schema.key_column,
            )
            .await
        {
            Ok(_) => return Ok(false),
            Err(RecordError::NotFound) => {}
            Err(e) => return Err(Self::lookup_error(principal, e)),
        }

        let mut row = Row::new();
        row.insert(
            self.schema.key_column.clone(),
            Value::String(principal.to_string()),
        );
        row.insert(self.schema.avatar_column.clone(), Value::Null);
        self.records
            .insert(&self.schema.table, row)
            .await
            .map_err(|e| Self::lookup_error(principal, e))?;
        Ok(true)
    }

    /// Point the row for `principal` at `avatar`.
    pub async fn link_avatar(
        &self,
        principal: &PrincipalId,
        avatar: &AvatarRef,
    ) -> Result<(), SyncError> {
        let mut patch = Row::new();
        patch.insert(
            self.schema.avatar_column.clone(),
            Value::String(avatar.to_string()),
        );
        let changed = self
            .records
            .update(&self.schema.table, &self.filter(principal), patch)
            .await
            .map_err(|e| Self::lookup_error(principal, e))?;

        match changed {
            0 => Err(SyncError::NotFound(principal.clone())),
            1 => Ok(()),
            n => {
                tracing::warn!(%principal, rows = n, "avatar linked on more than one profile row");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryRecordStore;
    use serde_json::json;

    fn repo() -> (Arc<InMemoryRecordStore>, ProfileRepository) {
        let store = Arc::new(InMemoryRecordStore::new());
        let repo = ProfileRepository::new(store.clone(), ProfileSchema::new("auth_uid"));
        (store, repo)
    }

    #[tokio::test]
    async fn stub_then_link_then_fetch() {
        let (store, repo) = repo();
        let id = PrincipalId::new("u-1");

        assert!(repo.create_stub(&id).await.unwrap());
        assert!(!repo.create_stub(&id).await.unwrap());
        assert_eq!(store.rows("profiles").len(), 1);
        assert_eq!(repo.fetch_avatar(&id).await.unwrap(), None);

        let avatar = AvatarRef::parse("https://cdn.example.com/u-1.png").unwrap();
        repo.link_avatar(&id, &avatar).await.unwrap();
        assert_eq!(repo.fetch_avatar(&id).await.unwrap(), Some(avatar));
    }

    #[tokio::test]
    async fn missing_and_duplicate_rows_are_errors() {
        let (store, repo) = repo();
        let id = PrincipalId::new("u-1");

        assert_eq!(
            repo.fetch_avatar(&id).await,
            Err(SyncError::NotFound(id.clone()))
        );

        let avatar = AvatarRef::parse("https://cdn.example.com/u-1.png").unwrap();
        assert_eq!(
            repo.link_avatar(&id, &avatar).await,
            Err(SyncError::NotFound(id.clone()))
        );

        for _ in 0..2 {
            store.seed(
                "profiles",
                json!({ "auth_uid": "u-1" }).as_object().cloned().unwrap(),
            );
        }
        assert_eq!(
            repo.fetch_avatar(&id).await,
            Err(SyncError::Ambiguous {
                principal: id,
                count: 2
            })
        );
    }

    #[tokio::test]
    async fn empty_string_is_no_avatar_and_garbage_is_invalid() {
        let (store, repo) = repo();
        store.seed(
            "profiles",
            json!({ "auth_uid": "u-1", "avatar_url": "" }).as_object().cloned().unwrap(),
        );
        store.seed(
            "profiles",
            json!({ "auth_uid": "u-2", "avatar_url": 42 }).as_object().cloned().unwrap(),
        );

        assert_eq!(repo.fetch_avatar(&PrincipalId::new("u-1")).await, Ok(None));
        assert!(matches!(
            repo.fetch_avatar(&PrincipalId::new("u-2")).await,
            Err(SyncError::InvalidReference { .. })
        ));
    }

    #[tokio::test]
    async fn honours_configured_key_column() {
        let store = Arc::new(InMemoryRecordStore::new());
        let repo = ProfileRepository::new(store.clone(), ProfileSchema::new("id"));
        repo.create_stub(&PrincipalId::new("u-9")).await.unwrap();
        assert_eq!(store.rows("profiles")[0]["id"], json!("u-9"));
    }
}
