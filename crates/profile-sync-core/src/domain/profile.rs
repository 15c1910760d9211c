//! Profile record model: avatar references, table schema, and object paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::SyncError;
use super::ids::PrincipalId;
use super::media::LocalImage;

/// A publicly retrievable URL for an avatar object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvatarRef(Url);

impl AvatarRef {
    pub fn parse(value: &str) -> Result<Self, SyncError> {
        Url::parse(value)
            .map(Self)
            .map_err(|e| SyncError::InvalidReference {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Url> for AvatarRef {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl std::fmt::Display for AvatarRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Where profile rows live in the record store.
///
/// The key column is deliberately not defaulted: deployments disagree on
/// whether rows are keyed by `auth_uid` or by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSchema {
    #[serde(default = "ProfileSchema::default_table")]
    pub table: String,
    pub key_column: String,
    #[serde(default = "ProfileSchema::default_avatar_column")]
    pub avatar_column: String,
}

impl ProfileSchema {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            table: Self::default_table(),
            key_column: key_column.into(),
            avatar_column: Self::default_avatar_column(),
        }
    }

    fn default_table() -> String {
        "profiles".to_string()
    }

    fn default_avatar_column() -> String {
        "avatar_url".to_string()
    }
}

/// How the storage path of an avatar object is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AvatarPathStrategy {
    /// One object per principal, overwritten on every upload:
    /// `avatars/{principal}/{file_name}`.
    FixedPerUser { file_name: String },

    /// A new object per upload: `{principal}-{unix_millis}-{original name}`.
    /// Characters outside `[A-Za-z0-9._-]` in the original name become `_`.
    Timestamped,
}

impl Default for AvatarPathStrategy {
    fn default() -> Self {
        AvatarPathStrategy::FixedPerUser {
            file_name: "avatar.png".to_string(),
        }
    }
}

impl AvatarPathStrategy {
    pub fn object_path(
        &self,
        principal: &PrincipalId,
        image: &LocalImage,
        now: DateTime<Utc>,
    ) -> String {
        match self {
            AvatarPathStrategy::FixedPerUser { file_name } => {
                format!("avatars/{principal}/{file_name}")
            }
            AvatarPathStrategy::Timestamped => {
                let name = image
                    .file_name
                    .as_deref()
                    .map(sanitize_file_name)
                    .unwrap_or_else(|| "avatar".to_string());
                format!("{principal}-{}-{name}", now.timestamp_millis())
            }
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}
