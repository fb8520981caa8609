//! lgnet - adaptive LG-unit networks
//!
//! Evaluates networks of integer-arithmetic transfer units ("LG units"),
//! processes evaluation requests from a job queue, persists the results and
//! grows future networks based on recent outcomes.

pub mod adapt;
pub mod domain;
pub mod error;
pub mod id;
pub mod lg;
pub mod processor;
pub mod queue;
pub mod store;

pub use error::{LgError, Result};
