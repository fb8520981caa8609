//! Task processing
//!
//! TaskProcessor handles a single task; the worker pool drives it from a
//! job queue.

mod task_processor;
mod worker;

pub use task_processor::{ProcessOutcome, TaskProcessor, TaskStage};
pub use worker::{WorkerPool, WorkerStats, run_worker};
