//! LG unit evaluation
//!
//! - evaluator: pure arithmetic for simple, associated and looped units
//! - network: bias lookup and summation over a connection list

pub mod evaluator;
pub mod network;

pub use evaluator::{LgResult, SimpleTrace, associated_lg, looped_lg, simple_lg, simple_trace};
pub use network::{NetworkEvaluation, UnitOutput, compute_network, evaluate_network, evaluate_unit};
