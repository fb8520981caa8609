//! Domain types for lgnet
//!
//! This module contains all core domain types:
//! - LgUnit/UnitType/Bias: a single transfer unit and its bias parameters
//! - NetworkConfig/LgConfigEntry: what a submitter asks to evaluate
//! - Task: one queued unit of work, plus submission decoding
//! - ResultRecord: the persisted outcome of a processed task

pub mod network;
pub mod record;
pub mod task;
pub mod unit;

pub use network::{LgConfigEntry, NetworkConfig};
pub use record::ResultRecord;
pub use task::{DecodedTask, RejectedTask, Task, decode_tasks};
pub use unit::{Bias, BiasTable, DEFAULT_ITERATIONS, LgUnit, UnitType};
