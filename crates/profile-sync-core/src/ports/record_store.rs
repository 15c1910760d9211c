//! RecordStore port - 外部のリレーショナルテーブルストア
//!
//! 行は JSON オブジェクト（列名 → 値）として扱う。
//! 条件は等価述語（`column = value`）のみ。

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::BackendError;

pub type Row = Map<String, Value>;

/// `column = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqFilter {
    pub column: String,
    pub value: String,
}

impl EqFilter {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("no row matches the filter")]
    NotFound,

    #[error("{0} rows match the filter, expected exactly one")]
    Multiple(usize),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// RecordStore は外部テーブルストアへのインターフェース
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read `field` from the single row of `table` matching `filter`.
    ///
    /// Zero rows is `RecordError::NotFound`, more than one is
    /// `RecordError::Multiple`. A present row with a null or missing field
    /// yields `Value::Null`.
    async fn select_single(
        &self,
        table: &str,
        filter: &EqFilter,
        field: &str,
    ) -> Result<Value, RecordError>;

    async fn insert(&self, table: &str, row: Row) -> Result<(), RecordError>;

    /// Merge `patch` into every row matching `filter`. Returns the number of
    /// rows changed.
    async fn update(&self, table: &str, filter: &EqFilter, patch: Row) -> Result<usize, RecordError>;
}
