//! LG unit definitions and bias parameters
//!
//! An LgUnit is one arithmetic transfer element of a network. Its bias lives
//! in a separate BiasTable keyed by `lgId`, so the same connection list can
//! be evaluated against different bias domains.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LgError;

/// Iterations a looped unit runs when none are given
pub const DEFAULT_ITERATIONS: u32 = 5;

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// The three unit variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// One division/modulo pass
    Simple,
    /// Two chained simple passes with independent biases
    Associated,
    /// A simple pass fed back into itself a fixed number of times
    Looped,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Associated => "associated",
            Self::Looped => "looped",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = LgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "associated" => Ok(Self::Associated),
            "looped" => Ok(Self::Looped),
            other => Err(LgError::UnknownUnitType(other.to_string())),
        }
    }
}

/// One unit in a network's connection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LgUnit {
    /// Key into the BiasTable
    pub lg_id: String,

    #[serde(rename = "type")]
    pub unit_type: UnitType,

    /// Summed "state" inputs
    #[serde(default)]
    pub st_inputs: Vec<i64>,

    /// Multiplied "pass-through" inputs
    #[serde(default)]
    pub pt_inputs: Vec<i64>,

    /// Feedback iterations (looped units only)
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl LgUnit {
    pub fn new(lg_id: impl Into<String>, unit_type: UnitType, st_inputs: Vec<i64>, pt_inputs: Vec<i64>) -> Self {
        Self {
            lg_id: lg_id.into(),
            unit_type,
            st_inputs,
            pt_inputs,
            iterations: DEFAULT_ITERATIONS,
        }
    }

    pub fn simple(lg_id: impl Into<String>, st_inputs: Vec<i64>, pt_inputs: Vec<i64>) -> Self {
        Self::new(lg_id, UnitType::Simple, st_inputs, pt_inputs)
    }

    pub fn associated(lg_id: impl Into<String>, st_inputs: Vec<i64>, pt_inputs: Vec<i64>) -> Self {
        Self::new(lg_id, UnitType::Associated, st_inputs, pt_inputs)
    }

    pub fn looped(lg_id: impl Into<String>, st_inputs: Vec<i64>, pt_inputs: Vec<i64>, iterations: u32) -> Self {
        Self {
            iterations,
            ..Self::new(lg_id, UnitType::Looped, st_inputs, pt_inputs)
        }
    }
}

/// Bias parameters for one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bias {
    /// Divisor for simple and looped units
    Scalar(i64),
    /// Divisors for the two stages of an associated unit
    Pair { b1: i64, b2: i64 },
}

impl Bias {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Pair { .. } => "pair",
        }
    }
}

/// Bias lookup keyed by `lgId`
pub type BiasTable = BTreeMap<String, Bias>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_type_from_str() {
        assert_eq!("simple".parse::<UnitType>().unwrap(), UnitType::Simple);
        assert_eq!("associated".parse::<UnitType>().unwrap(), UnitType::Associated);
        assert_eq!("looped".parse::<UnitType>().unwrap(), UnitType::Looped);
    }

    #[test]
    fn test_unit_type_from_str_unknown() {
        let err = "Simple".parse::<UnitType>().unwrap_err();
        assert!(matches!(err, LgError::UnknownUnitType(ref t) if t == "Simple"));
    }

    #[test]
    fn test_unit_type_display_matches_wire_name() {
        for t in [UnitType::Simple, UnitType::Associated, UnitType::Looped] {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t));
        }
    }

    #[test]
    fn test_lg_unit_wire_field_names() {
        let unit = LgUnit::simple("u1", vec![10], vec![3]);
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["lgId"], "u1");
        assert_eq!(json["type"], "simple");
        assert_eq!(json["stInputs"], serde_json::json!([10]));
        assert_eq!(json["ptInputs"], serde_json::json!([3]));
    }

    #[test]
    fn test_lg_unit_iterations_default() {
        let unit: LgUnit = serde_json::from_str(r#"{"lgId": "l", "type": "looped"}"#).unwrap();
        assert_eq!(unit.iterations, DEFAULT_ITERATIONS);
        assert!(unit.st_inputs.is_empty());
        assert!(unit.pt_inputs.is_empty());
    }

    #[test]
    fn test_looped_constructor_keeps_iterations() {
        let unit = LgUnit::looped("l", vec![], vec![], 9);
        assert_eq!(unit.unit_type, UnitType::Looped);
        assert_eq!(unit.iterations, 9);
    }

    #[test]
    fn test_bias_untagged_forms() {
        let scalar: Bias = serde_json::from_str("4").unwrap();
        assert_eq!(scalar, Bias::Scalar(4));

        let pair: Bias = serde_json::from_str(r#"{"b1": 3, "b2": 7}"#).unwrap();
        assert_eq!(pair, Bias::Pair { b1: 3, b2: 7 });
        assert_eq!(pair.shape(), "pair");
    }
}
