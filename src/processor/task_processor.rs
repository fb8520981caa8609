//! Task processor - evaluates, adapts and persists one task.
//!
//! Each task moves through `Received -> Evaluated -> Adapted -> Persisted`;
//! the worker that delivered it performs the final acknowledgement. A
//! failure at any stage before `Persisted` leaves no record behind and is
//! returned to the caller untouched.

use std::fmt;
use std::sync::Arc;

use log::{debug, info};

use crate::adapt::{AdaptationPolicy, HistoryStats};
use crate::domain::{ResultRecord, Task};
use crate::error::Result;
use crate::lg::compute_network;
use crate::store::ResultStore;

/// Processing stages of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    Received,
    Evaluated,
    Adapted,
    Persisted,
    Acknowledged,
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Evaluated => "evaluated",
            Self::Adapted => "adapted",
            Self::Persisted => "persisted",
            Self::Acknowledged => "acknowledged",
        };
        f.write_str(s)
    }
}

/// Result of processing one task
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    /// The record that was persisted
    pub record: ResultRecord,
    /// Statistics of the history window, None if there was no history
    pub stats: Option<HistoryStats>,
    /// lgId of the unit adaptation appended, if any
    pub grown: Option<String>,
}

impl ProcessOutcome {
    pub fn o_final(&self) -> i64 {
        self.record.o_final
    }
}

/// Processor with its store injected at construction
pub struct TaskProcessor<S: ResultStore> {
    store: Arc<S>,
    policy: AdaptationPolicy,
}

impl<S: ResultStore> TaskProcessor<S> {
    /// Create a processor with the default adaptation policy.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_policy(store, AdaptationPolicy::default())
    }

    pub fn with_policy(store: Arc<S>, policy: AdaptationPolicy) -> Self {
        Self { store, policy }
    }

    /// Process a task through to persistence and return its outcome.
    pub async fn process(&self, task: &Task) -> Result<ProcessOutcome> {
        debug!("task {} {}", task.id, TaskStage::Received);

        let network = &task.network;
        let o_final = compute_network(&network.connections, &network.biases)?;
        debug!("task {} {} O_final={}", task.id, TaskStage::Evaluated, o_final);

        let history: Vec<i64> = self
            .store
            .query_recent(self.policy.history_limit)
            .await?
            .iter()
            .map(|r| r.o_final)
            .collect();
        let adaptation = self.policy.adapt(&network.connections, &network.lg_config, &history);
        debug!(
            "task {} {} ({} units, grew: {})",
            task.id,
            TaskStage::Adapted,
            adaptation.connections.len(),
            adaptation.grew()
        );

        let record = ResultRecord::new(
            task.id.clone(),
            o_final,
            network.inputs.clone(),
            adaptation.connections,
            adaptation.lg_config,
        );
        self.store.insert(&record).await?;
        info!("task {} {} O_final={}", task.id, TaskStage::Persisted, o_final);

        Ok(ProcessOutcome {
            record,
            stats: adaptation.stats,
            grown: adaptation.grown,
        })
    }
}
