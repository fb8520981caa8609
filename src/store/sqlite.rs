//! SQLite-backed result store.
//!
//! Each record is kept as JSON in `json_data`, with the columns needed for
//! lookup and ordering pulled out alongside it. `seq` breaks timestamp ties
//! so that two records written in the same millisecond still come back in
//! insertion order.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, params};

use super::ResultStore;
use crate::domain::ResultRecord;
use crate::error::{LgError, Result};

pub struct SqliteResultStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteResultStore").finish_non_exhaustive()
    }
}

impl SqliteResultStore {
    /// Open or create a database file, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let db = Connection::open(path)?;
        Self::init_schema(&db)?;
        debug!("opened result store at {}", path.display());

        Ok(Self { db: Mutex::new(db) })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id TEXT NOT NULL,
                o_final INTEGER NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_task ON results(task_id);
            CREATE INDEX IF NOT EXISTS idx_results_timestamp ON results(timestamp_ms);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| LgError::PersistenceFailure(e.to_string()))
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn decode(json: &str) -> Result<ResultRecord> {
    serde_json::from_str(json).map_err(|e| LgError::PersistenceFailure(format!("corrupt result record: {}", e)))
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn insert(&self, record: &ResultRecord) -> Result<()> {
        let json_data = serde_json::to_string(record)?;

        self.lock()?.execute(
            r#"
            INSERT INTO results (task_id, o_final, timestamp_ms, json_data)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![record.task_id, record.o_final, record.timestamp_ms(), json_data],
        )?;

        Ok(())
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<ResultRecord>> {
        let db = self.lock()?;
        let mut stmt = db.prepare("SELECT json_data FROM results ORDER BY timestamp_ms DESC, seq DESC LIMIT ?1")?;
        let rows = stmt.query_map([limit as i64], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode(&row?)?);
        }

        Ok(records)
    }

    async fn find_one(&self, task_id: &str) -> Result<Option<ResultRecord>> {
        let result = self.lock()?.query_row(
            "SELECT json_data FROM results WHERE task_id = ?1 ORDER BY timestamp_ms DESC, seq DESC LIMIT 1",
            [task_id],
            |row| {
                let json: String = row.get(0)?;
                Ok(json)
            },
        );

        match result {
            Ok(json) => Ok(Some(decode(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
