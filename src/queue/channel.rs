//! In-process job queue over a tokio channel.
//!
//! Job state lives in a map next to the channel. A failed job goes back onto
//! the channel until it runs out of attempts, then stays in the map as
//! `Failed`. `receive` polls so that consumers notice when the queue has
//! been closed and every job has reached a terminal state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc;

use super::{Job, JobQueue, JobState};
use crate::domain::Task;
use crate::error::{LgError, Result};

/// Retry and polling behavior of a ChannelQueue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Deliveries per job before it is dead-lettered
    pub max_attempts: u32,
    /// How long `receive` waits before re-checking for shutdown
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl QueueConfig {
    pub fn new(max_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            poll_interval,
        }
    }
}

#[derive(Debug)]
struct JobEntry {
    /// None for submissions rejected before they became a task
    task: Option<Task>,
    state: JobState,
}

pub struct ChannelQueue {
    config: QueueConfig,
    tx: mpsc::UnboundedSender<Job>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>,
    jobs: Mutex<HashMap<String, JobEntry>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ChannelQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelQueue")
            .field("config", &self.config)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Default for ChannelQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl ChannelQueue {
    pub fn new(config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            tx,
            rx: tokio::sync::Mutex::new(rx),
            jobs: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn jobs(&self) -> Result<MutexGuard<'_, HashMap<String, JobEntry>>> {
        self.jobs.lock().map_err(|e| LgError::QueueFailure(e.to_string()))
    }

    fn is_drained(&self) -> Result<bool> {
        if !self.closed.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.jobs()?.values().all(|entry| entry.state.is_terminal()))
    }

    /// Register a new job id, refusing duplicates and closed queues
    fn register(&self, job_id: &str, entry: JobEntry) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LgError::QueueFailure("queue is closed".to_string()));
        }

        let mut jobs = self.jobs()?;
        if jobs.contains_key(job_id) {
            return Err(LgError::QueueFailure(format!("duplicate job id {}", job_id)));
        }
        jobs.insert(job_id.to_string(), entry);
        Ok(())
    }

    fn send(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|e| LgError::QueueFailure(format!("channel closed: {}", e)))
    }

    /// Attempt number of a job that must currently be processing
    fn processing_attempt(entry: &JobEntry, job_id: &str) -> Result<u32> {
        match entry.state {
            JobState::Processing { attempt } => Ok(attempt),
            ref other => Err(LgError::QueueFailure(format!(
                "job {} is {}, not processing",
                job_id,
                other.as_str()
            ))),
        }
    }

    /// Current state of every job, sorted by id
    pub fn snapshot(&self) -> Result<Vec<(String, JobState)>> {
        let mut states: Vec<(String, JobState)> = self
            .jobs()?
            .iter()
            .map(|(id, entry)| (id.clone(), entry.state.clone()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(states)
    }
}

#[async_trait]
impl JobQueue for ChannelQueue {
    async fn submit(&self, task: Task) -> Result<String> {
        let job_id = task.id.clone();
        self.register(
            &job_id,
            JobEntry {
                task: Some(task.clone()),
                state: JobState::Queued { attempt: 1 },
            },
        )?;

        self.send(Job {
            id: job_id.clone(),
            task,
            attempt: 1,
        })?;
        debug!("job {} queued", job_id);
        Ok(job_id)
    }

    async fn receive(&self) -> Result<Option<Job>> {
        loop {
            if self.is_drained()? {
                return Ok(None);
            }

            let received = {
                let mut rx = self.rx.lock().await;
                tokio::time::timeout(self.config.poll_interval, rx.recv()).await
            };

            match received {
                Ok(Some(job)) => {
                    if let Some(entry) = self.jobs()?.get_mut(&job.id) {
                        entry.state = JobState::Processing { attempt: job.attempt };
                    }
                    debug!("job {} delivered (attempt {})", job.id, job.attempt);
                    return Ok(Some(job));
                }
                Ok(None) => return Err(LgError::QueueFailure("channel closed".to_string())),
                Err(_) => continue,
            }
        }
    }

    async fn ack(&self, job_id: &str, value: i64) -> Result<()> {
        let mut jobs = self.jobs()?;
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| LgError::QueueFailure(format!("unknown job {}", job_id)))?;
        Self::processing_attempt(entry, job_id)?;
        entry.state = JobState::Completed { value };
        Ok(())
    }

    async fn fail(&self, job_id: &str, error: &LgError) -> Result<()> {
        let redeliver = {
            let mut jobs = self.jobs()?;
            let entry = jobs
                .get_mut(job_id)
                .ok_or_else(|| LgError::QueueFailure(format!("unknown job {}", job_id)))?;
            let attempt = Self::processing_attempt(entry, job_id)?;

            if attempt < self.config.max_attempts {
                warn!(
                    "job {} failed on attempt {}/{}, redelivering: {}",
                    job_id, attempt, self.config.max_attempts, error
                );
                let task = entry
                    .task
                    .clone()
                    .ok_or_else(|| LgError::QueueFailure(format!("job {} has no task", job_id)))?;
                entry.state = JobState::Queued { attempt: attempt + 1 };
                Some(Job {
                    id: job_id.to_string(),
                    task,
                    attempt: attempt + 1,
                })
            } else {
                warn!("job {} dead-lettered after {} attempts: {}", job_id, attempt, error);
                entry.state = JobState::Failed {
                    attempts: attempt,
                    reason: error.to_string(),
                };
                None
            }
        };

        if let Some(job) = redeliver {
            self.send(job)?;
        }
        Ok(())
    }

    async fn reject(&self, job_id: &str, error: &LgError) -> Result<()> {
        self.register(
            job_id,
            JobEntry {
                task: None,
                state: JobState::Failed {
                    attempts: 0,
                    reason: error.to_string(),
                },
            },
        )?;
        warn!("job {} rejected: {}", job_id, error);
        Ok(())
    }

    async fn status(&self, job_id: &str) -> Result<Option<JobState>> {
        Ok(self.jobs()?.get(job_id).map(|entry| entry.state.clone()))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        debug!("queue closed");
        Ok(())
    }
}
