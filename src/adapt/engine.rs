//! Structural adaptation
//!
//! Looks at recent outputs and decides whether the network should grow.
//! Growth-only: a unit is appended when the mean crosses the threshold,
//! nothing is ever removed. Inputs are borrowed and a new connection list is
//! returned, so concurrent tasks never share a mutable network.

use log::{debug, info};

use super::stats::HistoryStats;
use crate::domain::{LgConfigEntry, LgUnit, UnitType};
use crate::id::generate_lg_id;

/// Parameters of the growth rule
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationPolicy {
    /// How many recent records feed the statistics
    pub history_limit: usize,
    /// Grow when the mean is strictly above this
    pub mean_threshold: f64,
    /// Bias recorded in lgConfig for a grown unit
    pub looped_bias: i64,
    /// Iterations of a grown unit
    pub looped_iterations: u32,
}

impl Default for AdaptationPolicy {
    fn default() -> Self {
        Self {
            history_limit: 10,
            mean_threshold: 100.0,
            looped_bias: 3,
            looped_iterations: crate::domain::DEFAULT_ITERATIONS,
        }
    }
}

/// Adapted network structure plus what drove the decision
#[derive(Debug, Clone, PartialEq)]
pub struct Adaptation {
    pub connections: Vec<LgUnit>,
    pub lg_config: Vec<LgConfigEntry>,
    /// None when there was no history
    pub stats: Option<HistoryStats>,
    /// lgId of the appended unit, if the network grew
    pub grown: Option<String>,
}

impl Adaptation {
    pub fn grew(&self) -> bool {
        self.grown.is_some()
    }
}

impl AdaptationPolicy {
    /// Adapt using a time-derived id for any grown unit.
    ///
    /// `history` is newest first; only the first `history_limit` values are used.
    pub fn adapt(&self, connections: &[LgUnit], lg_config: &[LgConfigEntry], history: &[i64]) -> Adaptation {
        self.adapt_with(connections, lg_config, history, generate_lg_id)
    }

    /// Adapt with a caller-supplied id source
    pub fn adapt_with<F>(
        &self,
        connections: &[LgUnit],
        lg_config: &[LgConfigEntry],
        history: &[i64],
        next_id: F,
    ) -> Adaptation
    where
        F: FnOnce() -> String,
    {
        let window = &history[..history.len().min(self.history_limit)];
        let stats = HistoryStats::from_history(window);

        let mut connections = connections.to_vec();
        let mut lg_config = lg_config.to_vec();
        let mut grown = None;

        match &stats {
            None => debug!("no history, network unchanged"),
            Some(s) => {
                debug!(
                    "history n={} mean={:.2} median={} mode={}",
                    s.count, s.mean, s.median, s.mode
                );

                if s.mean > self.mean_threshold {
                    let lg_id = next_id();
                    info!(
                        "mean {:.2} above {}, growing network with looped unit {}",
                        s.mean, self.mean_threshold, lg_id
                    );
                    connections.push(LgUnit::looped(lg_id.clone(), Vec::new(), Vec::new(), self.looped_iterations));
                    lg_config.push(LgConfigEntry::new(UnitType::Looped, self.looped_bias));
                    grown = Some(lg_id);
                }
            }
        }

        Adaptation {
            connections,
            lg_config,
            stats,
            grown,
        }
    }
}
