//! SyncConfig - deployment settings for the profile workflow.
//!
//! Loaded from `PROFILE_SYNC_*` environment variables or from JSON. Unset
//! optional variables fall back to defaults and say so in the log.
//! `PROFILE_SYNC_KEY_COLUMN` has no default.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{AvatarPathStrategy, PickOptions, ProfileSchema};

pub const DEFAULT_BUCKET: &str = "avatars";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("malformed config document: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub schema: ProfileSchema,
    #[serde(default)]
    pub path_strategy: AvatarPathStrategy,
    #[serde(default)]
    pub pick_options: PickOptions,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

impl SyncConfig {
    /// Defaults for everything except the key column.
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            bucket: default_bucket(),
            schema: ProfileSchema::new(key_column),
            path_strategy: AvatarPathStrategy::default(),
            pick_options: PickOptions::default(),
        }
    }

    pub fn with_path_strategy(mut self, strategy: AvatarPathStrategy) -> Self {
        self.path_strategy = strategy;
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key_column = lookup("PROFILE_SYNC_KEY_COLUMN")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                warn!("PROFILE_SYNC_KEY_COLUMN not set; profile rows cannot be addressed");
                ConfigError::Missing("PROFILE_SYNC_KEY_COLUMN")
            })?;

        let schema = ProfileSchema {
            table: try_load(&lookup, "PROFILE_SYNC_TABLE", "profiles")?,
            key_column,
            avatar_column: try_load(&lookup, "PROFILE_SYNC_AVATAR_COLUMN", "avatar_url")?,
        };

        let strategy: String = try_load(&lookup, "PROFILE_SYNC_PATH_STRATEGY", "fixed")?;
        let path_strategy = match strategy.as_str() {
            "fixed" => AvatarPathStrategy::FixedPerUser {
                file_name: try_load(&lookup, "PROFILE_SYNC_AVATAR_FILE", "avatar.png")?,
            },
            "timestamped" => AvatarPathStrategy::Timestamped,
            other => {
                return Err(ConfigError::Invalid {
                    key: "PROFILE_SYNC_PATH_STRATEGY",
                    reason: format!("unknown strategy {other:?} (expected fixed or timestamped)"),
                });
            }
        };

        let defaults = PickOptions::default();
        let pick_options = PickOptions {
            quality: try_load(&lookup, "PROFILE_SYNC_PICK_QUALITY", &defaults.quality.to_string())?,
            allow_edit: try_load(
                &lookup,
                "PROFILE_SYNC_PICK_ALLOW_EDIT",
                &defaults.allow_edit.to_string(),
            )?,
            ..defaults
        };

        let config = Self {
            bucket: try_load(&lookup, "PROFILE_SYNC_BUCKET", DEFAULT_BUCKET)?,
            schema,
            path_strategy,
            pick_options,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_empty = [
            ("bucket", &self.bucket),
            ("schema.table", &self.schema.table),
            ("schema.key_column", &self.schema.key_column),
            ("schema.avatar_column", &self.schema.avatar_column),
        ];
        for (key, value) in non_empty {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if self.schema.key_column == self.schema.avatar_column {
            return Err(ConfigError::Invalid {
                key: "schema.avatar_column",
                reason: "must differ from the key column".to_string(),
            });
        }
        if let AvatarPathStrategy::FixedPerUser { file_name } = &self.path_strategy {
            if file_name.is_empty() || file_name.contains('/') {
                return Err(ConfigError::Invalid {
                    key: "path_strategy.file_name",
                    reason: format!("{file_name:?} is not a plain file name"),
                });
            }
        }
        let quality = self.pick_options.quality;
        if !(0.0..=1.0).contains(&quality) {
            return Err(ConfigError::Invalid {
                key: "pick_options.quality",
                reason: format!("{quality} is outside 0.0..=1.0"),
            });
        }
        let (w, h) = self.pick_options.aspect;
        if w == 0 || h == 0 {
            return Err(ConfigError::Invalid {
                key: "pick_options.aspect",
                reason: "aspect ratio terms must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn key_column_is_required() {
        assert_eq!(
            SyncConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("PROFILE_SYNC_KEY_COLUMN"))
        );
    }

    #[test]
    fn env_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[("PROFILE_SYNC_KEY_COLUMN", "id")])).unwrap();
        assert_eq!(config, SyncConfig::new("id"));
        assert_eq!(config.bucket, "avatars");
        assert_eq!(config.schema.table, "profiles");
    }

    #[test]
    fn env_overrides() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("PROFILE_SYNC_KEY_COLUMN", "auth_uid"),
            ("PROFILE_SYNC_BUCKET", "pics"),
            ("PROFILE_SYNC_PATH_STRATEGY", "timestamped"),
            ("PROFILE_SYNC_PICK_QUALITY", "0.5"),
            ("PROFILE_SYNC_PICK_ALLOW_EDIT", "false"),
        ]))
        .unwrap();
        assert_eq!(config.bucket, "pics");
        assert_eq!(config.path_strategy, AvatarPathStrategy::Timestamped);
        assert_eq!(config.pick_options.quality, 0.5);
        assert!(!config.pick_options.allow_edit);
        assert_eq!(config.pick_options.aspect, (1, 1));
    }

    #[test]
    fn env_rejects_bad_values() {
        let err = SyncConfig::from_lookup(lookup(&[
            ("PROFILE_SYNC_KEY_COLUMN", "id"),
            ("PROFILE_SYNC_PICK_QUALITY", "1.5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "pick_options.quality", .. }));

        let err = SyncConfig::from_lookup(lookup(&[
            ("PROFILE_SYNC_KEY_COLUMN", "id"),
            ("PROFILE_SYNC_PATH_STRATEGY", "random"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PROFILE_SYNC_PATH_STRATEGY", .. }));
    }

    #[test]
    fn json_document() {
        let config = SyncConfig::from_json_str(
            r#"{
                "schema": { "key_column": "auth_uid" },
                "path_strategy": { "strategy": "fixed_per_user", "file_name": "me.jpg" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.schema.avatar_column, "avatar_url");
        assert_eq!(
            config.path_strategy,
            AvatarPathStrategy::FixedPerUser {
                file_name: "me.jpg".to_string()
            }
        );

        assert!(matches!(
            SyncConfig::from_json_str(r#"{ "bucket": "x" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn key_and_avatar_columns_must_differ() {
        let mut config = SyncConfig::new("avatar_url");
        assert!(config.validate().is_err());
        config.schema.key_column = "id".to_string();
        assert!(config.validate().is_ok());
    }
}
