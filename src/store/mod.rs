//! Result persistence
//!
//! The processor only needs three operations from its store: insert a
//! record, read the most recent records, and look one up by task id. Two
//! implementations are provided: SQLite for the CLI and an in-memory vector
//! for tests and dry runs.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::domain::ResultRecord;
use crate::error::Result;

pub use memory::MemoryResultStore;
pub use sqlite::SqliteResultStore;

/// Persistent store of result records
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist a new record. Records are never updated.
    async fn insert(&self, record: &ResultRecord) -> Result<()>;

    /// Up to `limit` records, newest first
    async fn query_recent(&self, limit: usize) -> Result<Vec<ResultRecord>>;

    /// The newest record for a task, if any
    async fn find_one(&self, task_id: &str) -> Result<Option<ResultRecord>>;
}
