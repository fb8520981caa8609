//! Network configuration
//!
//! A NetworkConfig is what a submitter hands in: the connection list, the
//! bias table and the record of structural adaptations so far. It is treated
//! as an immutable value; adaptation produces a new one.

use serde::{Deserialize, Serialize};

use super::unit::{BiasTable, LgUnit, UnitType};

/// A structural-adaptation record appended alongside a grown unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LgConfigEntry {
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub bias: i64,
}

impl LgConfigEntry {
    pub fn new(unit_type: UnitType, bias: i64) -> Self {
        Self { unit_type, bias }
    }
}

/// Everything needed to evaluate one network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Network-level inputs, currently informational
    #[serde(default)]
    pub inputs: Vec<f64>,

    #[serde(default)]
    pub connections: Vec<LgUnit>,

    #[serde(default)]
    pub biases: BiasTable,

    #[serde(default)]
    pub lg_config: Vec<LgConfigEntry>,
}

impl NetworkConfig {
    pub fn new(connections: Vec<LgUnit>, biases: BiasTable) -> Self {
        Self {
            connections,
            biases,
            ..Self::default()
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<f64>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_lg_config(mut self, lg_config: Vec<LgConfigEntry>) -> Self {
        self.lg_config = lg_config;
        self
    }
}
