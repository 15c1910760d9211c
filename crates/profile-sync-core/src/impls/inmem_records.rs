//! InMemoryRecordStore - 開発用のテーブルストア
//!
//! テーブル名ごとに `Vec<Row>` を保持する。主キー制約はない
//! （重複行を作れるので Ambiguous のテストに使える）。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::fault::{FaultInjector, FaultPoint};
use super::lock;
use crate::domain::BackendError;
use crate::ports::{EqFilter, RecordError, RecordStore, Row};

#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    faults: FaultInjector,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Insert a row directly, bypassing fault injection.
    pub fn seed(&self, table: &str, row: Row) {
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    pub fn count_matching(&self, table: &str, filter: &EqFilter) -> usize {
        lock(&self.tables)
            .get(table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).count())
            .unwrap_or(0)
    }

    fn check(&self, point: FaultPoint) -> Result<(), RecordError> {
        match self.faults.check(point) {
            Some(message) => Err(BackendError::records(message).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn select_single(
        &self,
        table: &str,
        filter: &EqFilter,
        field: &str,
    ) -> Result<Value, RecordError> {
        self.check(FaultPoint::Select)?;

        let tables = lock(&self.tables);
        let mut matching = tables
            .get(table)
            .into_iter()
            .flatten()
            .filter(|r| filter.matches(r));
        let row = matching.next().ok_or(RecordError::NotFound)?;
        let extra = matching.count();
        if extra > 0 {
            return Err(RecordError::Multiple(extra + 1));
        }
        Ok(row.get(field).cloned().unwrap_or(Value::Null))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<(), RecordError> {
        self.check(FaultPoint::Insert)?;
        self.seed(table, row);
        Ok(())
    }

    async fn update(&self, table: &str, filter: &EqFilter, patch: Row) -> Result<usize, RecordError> {
        self.check(FaultPoint::Update)?;

        let mut tables = lock(&self.tables);
        let mut changed = 0;
        for row in tables.get_mut(table).into_iter().flatten() {
            if filter.matches(row) {
                row.extend(patch.clone());
                changed += 1;
            }
        }
        Ok(changed)
    }
}
