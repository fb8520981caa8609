//! In-memory result store.

use std::sync::RwLock;

use async_trait::async_trait;

use super::ResultStore;
use crate::domain::ResultRecord;
use crate::error::{LgError, Result};

#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: RwLock<Vec<ResultRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        self.records
            .read()
            .map(|r| r.len())
            .map_err(|e| LgError::PersistenceFailure(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every record in insertion order
    pub fn all(&self) -> Result<Vec<ResultRecord>> {
        self.records
            .read()
            .map(|r| r.clone())
            .map_err(|e| LgError::PersistenceFailure(e.to_string()))
    }

    /// Records newest first; later inserts win timestamp ties
    fn newest_first(&self) -> Result<Vec<ResultRecord>> {
        let mut indexed: Vec<(usize, ResultRecord)> = self.all()?.into_iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        Ok(indexed.into_iter().map(|(_, r)| r).collect())
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn insert(&self, record: &ResultRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|e| LgError::PersistenceFailure(e.to_string()))?
            .push(record.clone());
        Ok(())
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<ResultRecord>> {
        let mut records = self.newest_first()?;
        records.truncate(limit);
        Ok(records)
    }

    async fn find_one(&self, task_id: &str) -> Result<Option<ResultRecord>> {
        Ok(self.newest_first()?.into_iter().find(|r| r.task_id == task_id))
    }
}
