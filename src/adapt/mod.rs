//! Adaptation engine
//!
//! Heuristic structural growth driven by recent-result statistics. This is
//! not gradient-based learning; the only decision is whether to append a
//! looped unit.

pub mod engine;
pub mod stats;

pub use engine::{Adaptation, AdaptationPolicy};
pub use stats::HistoryStats;
