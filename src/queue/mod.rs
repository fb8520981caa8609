//! Job queue contract
//!
//! Delivery is at-least-once: a job that fails is handed back to the queue,
//! which decides whether to redeliver it or dead-letter it. Consumers never
//! retry on their own.

mod channel;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::Task;
use crate::error::{LgError, Result};

pub use channel::{ChannelQueue, QueueConfig};

/// A delivered task
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub task: Task,
    /// 1 for the first delivery
    pub attempt: u32,
}

/// Lifecycle of a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for a consumer
    Queued { attempt: u32 },
    /// Handed to a consumer, not yet acked or failed
    Processing { attempt: u32 },
    /// Acked with the network output
    Completed { value: i64 },
    /// Dead-lettered after its last attempt, or rejected with 0 attempts
    Failed { attempts: u32, reason: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued { .. } => "queued",
            Self::Processing { .. } => "processing",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a task; the job id is the task id
    async fn submit(&self, task: Task) -> Result<String>;

    /// Next job, or None once the queue is closed and nothing is left in flight
    async fn receive(&self) -> Result<Option<Job>>;

    /// Mark a processing job complete with its result value
    async fn ack(&self, job_id: &str, value: i64) -> Result<()>;

    /// Report a processing failure; the queue applies its retry policy
    async fn fail(&self, job_id: &str, error: &LgError) -> Result<()>;

    /// Record a submission that never became a task as failed without
    /// delivering it
    async fn reject(&self, job_id: &str, error: &LgError) -> Result<()>;

    async fn status(&self, job_id: &str) -> Result<Option<JobState>>;

    /// Stop accepting submissions; queued and in-flight jobs still drain
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_is_terminal() {
        assert!(!JobState::Queued { attempt: 1 }.is_terminal());
        assert!(!JobState::Processing { attempt: 1 }.is_terminal());
        assert!(JobState::Completed { value: 4 }.is_terminal());
        assert!(
            JobState::Failed {
                attempts: 3,
                reason: "x".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_job_state_serializes_tagged() {
        let json = serde_json::to_value(JobState::Completed { value: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"state": "completed", "value": 4}));
        assert_eq!(JobState::Processing { attempt: 2 }.as_str(), "processing");
    }
}
