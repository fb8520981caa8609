//! Worker pool - the pull-process-ack loop.
//!
//! Each worker repeatedly:
//! 1. Receives a job from the queue
//! 2. Runs it through the TaskProcessor
//! 3. Acks it with `O_final`, or hands the error back to the queue
//!
//! Workers share nothing but the queue and the store. A queue failure stops
//! the worker that hit it; processing failures never do.

use std::sync::Arc;

use log::{error, info, warn};
use serde::Serialize;
use tokio::task::JoinSet;

use super::task_processor::{TaskProcessor, TaskStage};
use crate::error::{LgError, Result};
use crate::queue::JobQueue;
use crate::store::ResultStore;

/// Counters for one worker, or summed over a pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Deliveries received, including redeliveries
    pub received: u64,
    /// Deliveries acked
    pub completed: u64,
    /// Deliveries handed back as failed
    pub failed: u64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: &WorkerStats) {
        self.received += other.received;
        self.completed += other.completed;
        self.failed += other.failed;
    }
}

/// Run one worker until the queue reports it is drained.
pub async fn run_worker<Q, S>(worker_id: usize, queue: Arc<Q>, processor: Arc<TaskProcessor<S>>) -> Result<WorkerStats>
where
    Q: JobQueue + ?Sized,
    S: ResultStore,
{
    let mut stats = WorkerStats::new();

    while let Some(job) = queue.receive().await? {
        stats.received += 1;

        match processor.process(&job.task).await {
            Ok(outcome) => {
                queue.ack(&job.id, outcome.o_final()).await?;
                stats.completed += 1;
                info!(
                    "worker {} job {} {} O_final={}",
                    worker_id,
                    job.id,
                    TaskStage::Acknowledged,
                    outcome.o_final()
                );
            }
            Err(e) if e.is_evaluation_error() => {
                // Deterministic: a redelivery fails the same way
                warn!("worker {} job {} is not evaluable: {}", worker_id, job.id, e);
                queue.fail(&job.id, &e).await?;
                stats.failed += 1;
            }
            Err(e) => {
                error!("worker {} job {} attempt {} failed: {}", worker_id, job.id, job.attempt, e);
                queue.fail(&job.id, &e).await?;
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

/// A fixed number of workers consuming one queue
pub struct WorkerPool<Q, S>
where
    Q: JobQueue + 'static,
    S: ResultStore + 'static,
{
    queue: Arc<Q>,
    processor: Arc<TaskProcessor<S>>,
    concurrency: usize,
}

impl<Q, S> WorkerPool<Q, S>
where
    Q: JobQueue + 'static,
    S: ResultStore + 'static,
{
    pub fn new(queue: Arc<Q>, processor: Arc<TaskProcessor<S>>, concurrency: usize) -> Self {
        Self {
            queue,
            processor,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every worker to completion and sum their counters.
    ///
    /// The first worker error is returned after all workers have stopped.
    pub async fn run(&self) -> Result<WorkerStats> {
        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            let queue = Arc::clone(&self.queue);
            let processor = Arc::clone(&self.processor);
            workers.spawn(run_worker(worker_id, queue, processor));
        }
        info!("started {} worker(s)", self.concurrency);

        let mut total = WorkerStats::new();
        let mut first_error = None;

        while let Some(joined) = workers.join_next().await {
            let result = joined.map_err(|e| LgError::QueueFailure(format!("worker task aborted: {}", e)));
            match result.and_then(|r| r) {
                Ok(stats) => total.merge(&stats),
                Err(e) => {
                    error!("worker stopped: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::{Bias, BiasTable, LgUnit, NetworkConfig, Task};
    use crate::queue::{ChannelQueue, JobState, QueueConfig};
    use crate::store::MemoryResultStore;

    fn simple_task(id: &str, bias: i64) -> Task {
        let mut biases = BiasTable::new();
        biases.insert("u1".to_string(), Bias::Scalar(bias));
        Task::with_id(
            id,
            NetworkConfig::new(vec![LgUnit::simple("u1", vec![10], vec![3])], biases),
        )
    }

    fn fast_queue(max_attempts: u32) -> Arc<ChannelQueue> {
        Arc::new(ChannelQueue::new(QueueConfig::new(max_attempts, Duration::from_millis(5))))
    }

    #[test]
    fn test_worker_stats_merge() {
        let mut a = WorkerStats {
            received: 2,
            completed: 1,
            failed: 1,
        };
        a.merge(&WorkerStats {
            received: 3,
            completed: 3,
            failed: 0,
        });
        assert_eq!(a.received, 5);
        assert_eq!(a.completed, 4);
        assert_eq!(a.failed, 1);
    }

    #[tokio::test]
    async fn test_single_worker_processes_all_jobs() {
        let queue = fast_queue(3);
        let store = Arc::new(MemoryResultStore::new());
        let processor = Arc::new(TaskProcessor::new(store.clone()));

        for i in 0..3 {
            queue.submit(simple_task(&format!("t{}", i), 4)).await.unwrap();
        }
        queue.close().await.unwrap();

        let stats = WorkerPool::new(queue.clone(), processor, 1).run().await.unwrap();
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(store.len().unwrap(), 3);
        assert_eq!(queue.status("t1").await.unwrap(), Some(JobState::Completed { value: 4 }));
    }

    #[tokio::test]
    async fn test_failed_job_retried_then_dead_lettered() {
        let queue = fast_queue(2);
        let store = Arc::new(MemoryResultStore::new());
        let processor = Arc::new(TaskProcessor::new(store.clone()));

        queue.submit(simple_task("bad", 0)).await.unwrap();
        queue.submit(simple_task("good", 4)).await.unwrap();
        queue.close().await.unwrap();

        let stats = WorkerPool::new(queue.clone(), processor, 2).run().await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.received, 3);

        assert!(store.find_one("bad").await.unwrap().is_none());
        assert!(matches!(
            queue.status("bad").await.unwrap(),
            Some(JobState::Failed { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_pool_with_many_workers_drains_queue() {
        let queue = fast_queue(1);
        let store = Arc::new(MemoryResultStore::new());
        let processor = Arc::new(TaskProcessor::new(store.clone()));

        for i in 0..20 {
            queue.submit(simple_task(&format!("t{:02}", i), 4)).await.unwrap();
        }
        queue.close().await.unwrap();

        let pool = WorkerPool::new(queue.clone(), processor, 4);
        assert_eq!(pool.concurrency(), 4);
        let stats = pool.run().await.unwrap();
        assert_eq!(stats.completed, 20);
        assert_eq!(store.len().unwrap(), 20);
    }

    #[test]
    fn test_zero_concurrency_runs_one_worker() {
        let pool = WorkerPool::new(
            fast_queue(1),
            Arc::new(TaskProcessor::new(Arc::new(MemoryResultStore::new()))),
            0,
        );
        assert_eq!(pool.concurrency(), 1);
    }
}
