//! End-to-end pipeline integration tests
//!
//! Tests the submit -> process -> persist -> lookup flow through the public
//! API with the in-process queue and both result stores.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lgnet::domain::{ResultRecord, Task, UnitType, decode_tasks};
use lgnet::error::{LgError, Result};
use lgnet::processor::{TaskProcessor, WorkerPool};
use lgnet::queue::{ChannelQueue, JobQueue, JobState, QueueConfig};
use lgnet::store::{MemoryResultStore, ResultStore, SqliteResultStore};
use tempfile::TempDir;

const REFERENCE_TASK: &str = r#"{
    "id": "ref",
    "inputs": [],
    "connections": [{"type": "simple", "lgId": "u1", "stInputs": [10], "ptInputs": [3]}],
    "biases": {"u1": 4},
    "lgConfig": []
}"#;

fn fast_queue(max_attempts: u32) -> Arc<ChannelQueue> {
    Arc::new(ChannelQueue::new(QueueConfig::new(max_attempts, Duration::from_millis(5))))
}

async fn run_all<S: ResultStore + 'static>(queue: Arc<ChannelQueue>, store: Arc<S>, workers: usize) -> Result<()> {
    queue.close().await?;
    let processor = Arc::new(TaskProcessor::new(store));
    WorkerPool::new(queue, processor, workers).run().await?;
    Ok(())
}

/// Integration test: the reference task evaluates to 4 and is retrievable
#[tokio::test]
async fn test_reference_task_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(SqliteResultStore::open(temp_dir.path().join("results.db"))?);
    let queue = fast_queue(3);

    let job_id = queue.submit(Task::from_json(REFERENCE_TASK)?).await?;
    assert_eq!(job_id, "ref");
    run_all(queue.clone(), store.clone(), 1).await?;

    assert_eq!(queue.status("ref").await?, Some(JobState::Completed { value: 4 }));

    let record = store.find_one("ref").await?.expect("record persisted");
    assert_eq!(record.o_final, 4);
    assert_eq!(record.connections.len(), 1);
    assert!(record.lg_config.is_empty());

    Ok(())
}

/// Integration test: lookup of an unknown task is an explicit miss
#[tokio::test]
async fn test_unknown_task_lookup_is_none() -> Result<()> {
    let store = SqliteResultStore::open_in_memory()?;
    assert!(store.find_one("never-submitted").await?.is_none());
    Ok(())
}

/// Integration test: high history grows the stored network, not the output
#[tokio::test]
async fn test_high_history_grows_network() -> Result<()> {
    let store = Arc::new(MemoryResultStore::new());
    for i in 0..3 {
        store
            .insert(&ResultRecord::new(format!("seed-{}", i), 150, vec![], vec![], vec![]))
            .await?;
    }

    let queue = fast_queue(3);
    queue.submit(Task::from_json(REFERENCE_TASK)?).await?;
    run_all(queue, store.clone(), 1).await?;

    let record = store.find_one("ref").await?.expect("record persisted");
    assert_eq!(record.o_final, 4);
    assert_eq!(record.connections.len(), 2);
    assert_eq!(record.connections[1].unit_type, UnitType::Looped);
    assert_eq!(record.connections[1].iterations, 5);
    assert_eq!(record.lg_config.len(), 1);
    assert_eq!(record.lg_config[0].bias, 3);

    Ok(())
}

/// Integration test: low history leaves the network alone
#[tokio::test]
async fn test_low_history_keeps_network() -> Result<()> {
    let store = Arc::new(MemoryResultStore::new());
    for v in [150, 50, 50] {
        store.insert(&ResultRecord::new("seed", v, vec![], vec![], vec![])).await?;
    }

    let queue = fast_queue(3);
    queue.submit(Task::from_json(REFERENCE_TASK)?).await?;
    run_all(queue, store.clone(), 1).await?;

    let record = store.find_one("ref").await?.expect("record persisted");
    assert_eq!(record.connections.len(), 1);
    assert!(record.lg_config.is_empty());

    Ok(())
}

/// Integration test: evaluation failures dead-letter without a record
#[tokio::test]
async fn test_invalid_bias_dead_letters() -> Result<()> {
    let store = Arc::new(MemoryResultStore::new());
    let queue = fast_queue(2);

    let tasks = decode_tasks(
        r#"[
            {"id": "zero", "connections": [{"type": "simple", "lgId": "u", "stInputs": [1]}], "biases": {"u": 0}},
            {"id": "missing", "connections": [{"type": "looped", "lgId": "l"}]}
        ]"#,
    )?;
    for task in tasks {
        queue.submit(task.expect("entry decodes")).await?;
    }
    run_all(queue.clone(), store.clone(), 2).await?;

    for id in ["zero", "missing"] {
        match queue.status(id).await? {
            Some(JobState::Failed { attempts, reason }) => {
                assert_eq!(attempts, 2);
                assert!(reason.starts_with("Invalid bias"), "{}", reason);
            }
            other => panic!("expected {} to be dead-lettered, got {:?}", id, other),
        }
    }
    assert!(store.is_empty()?);

    Ok(())
}

/// Integration test: an undecodable entry fails alone and its siblings still run
#[tokio::test]
async fn test_mixed_batch_isolates_bad_entry() -> Result<()> {
    let store = Arc::new(MemoryResultStore::new());
    let queue = fast_queue(3);

    let entries = decode_tasks(
        r#"[
            {"id": "good", "connections": [{"type": "simple", "lgId": "u1", "stInputs": [10], "ptInputs": [3]}], "biases": {"u1": 4}},
            {"id": "bad", "connections": [{"type": "recurrent", "lgId": "r"}]}
        ]"#,
    )?;
    for entry in entries {
        match entry {
            Ok(task) => {
                queue.submit(task).await?;
            }
            Err(rejected) => queue.reject(&rejected.id, &rejected.error).await?,
        }
    }
    run_all(queue.clone(), store.clone(), 1).await?;

    assert_eq!(queue.status("good").await?, Some(JobState::Completed { value: 4 }));
    match queue.status("bad").await? {
        Some(JobState::Failed { attempts, reason }) => {
            assert_eq!(attempts, 0);
            assert_eq!(reason, "Unknown unit type: recurrent");
        }
        other => panic!("expected bad entry to be failed, got {:?}", other),
    }

    assert_eq!(store.find_one("good").await?.map(|r| r.o_final), Some(4));
    assert!(store.find_one("bad").await?.is_none());
    assert_eq!(queue.snapshot()?.len(), 2);

    Ok(())
}

/// Store that rejects the first N inserts, then behaves normally
struct FlakyStore {
    inner: MemoryResultStore,
    rejections_left: std::sync::Mutex<u32>,
}

#[async_trait]
impl ResultStore for FlakyStore {
    async fn insert(&self, record: &ResultRecord) -> Result<()> {
        {
            let mut left = self.rejections_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(LgError::PersistenceFailure("store unavailable".into()));
            }
        }
        self.inner.insert(record).await
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<ResultRecord>> {
        self.inner.query_recent(limit).await
    }

    async fn find_one(&self, task_id: &str) -> Result<Option<ResultRecord>> {
        self.inner.find_one(task_id).await
    }
}

/// Integration test: a persistence failure is retried by the queue
#[tokio::test]
async fn test_persistence_failure_redelivered() -> Result<()> {
    let store = Arc::new(FlakyStore {
        inner: MemoryResultStore::new(),
        rejections_left: std::sync::Mutex::new(1),
    });
    let queue = fast_queue(3);

    queue.submit(Task::from_json(REFERENCE_TASK)?).await?;
    run_all(queue.clone(), store.clone(), 1).await?;

    assert_eq!(queue.status("ref").await?, Some(JobState::Completed { value: 4 }));
    assert_eq!(store.inner.len()?, 1);

    Ok(())
}

/// Integration test: concurrent workers each persist exactly one record per task
#[tokio::test]
async fn test_concurrent_workers_persist_every_task() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(SqliteResultStore::open(temp_dir.path().join("results.db"))?);
    let queue = fast_queue(1);

    for i in 0..12 {
        let json = REFERENCE_TASK.replace("\"ref\"", &format!("\"t{}\"", i));
        queue.submit(Task::from_json(&json)?).await?;
    }
    run_all(queue.clone(), store.clone(), 3).await?;

    assert_eq!(store.count()?, 12);
    let recent = store.query_recent(10).await?;
    assert_eq!(recent.len(), 10);
    assert!(recent.iter().all(|r| r.o_final == 4));
    assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    Ok(())
}
