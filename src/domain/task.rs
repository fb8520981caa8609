//! Task records and submission decoding
//!
//! Submitters hand in loose JSON (the shape of the original submit body).
//! Decoding runs in two stages so that a bad value surfaces as a typed
//! error (`MalformedInput`, `UnknownUnitType`, `InvalidBias`) instead of an
//! opaque JSON error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::network::{LgConfigEntry, NetworkConfig};
use super::unit::{Bias, BiasTable, DEFAULT_ITERATIONS, LgUnit, UnitType};
use crate::error::{LgError, Result};
use crate::id::generate_task_id;

/// One asynchronous unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    #[serde(flatten)]
    pub network: NetworkConfig,
}

impl Task {
    /// Create a task with a freshly generated id
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            id: generate_task_id(),
            network,
        }
    }

    pub fn with_id(id: impl Into<String>, network: NetworkConfig) -> Self {
        Self { id: id.into(), network }
    }

    /// Decode a single task object
    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    /// Decode a task from an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let payload: TaskPayload =
            serde_json::from_value(value).map_err(|e| LgError::MalformedInput(format!("task payload: {}", e)))?;
        payload.into_task()
    }
}

/// A submitted entry that could not be decoded into a task
#[derive(Debug)]
pub struct RejectedTask {
    /// The entry's own id when it carried one, otherwise a generated one
    pub id: String,
    pub error: LgError,
}

/// Outcome of decoding one entry of a submission
pub type DecodedTask = std::result::Result<Task, RejectedTask>;

/// Decode either one task object or an array of them.
///
/// Only unparseable JSON fails the whole input. Each entry is decoded on
/// its own, so a bad entry does not take its siblings down with it.
pub fn decode_tasks(input: &str) -> Result<Vec<DecodedTask>> {
    let entries = match serde_json::from_str(input)? {
        Value::Array(items) => items,
        value => vec![value],
    };
    Ok(entries.into_iter().map(decode_entry).collect())
}

fn decode_entry(value: Value) -> DecodedTask {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    Task::from_value(value).map_err(|error| RejectedTask {
        id: id.unwrap_or_else(generate_task_id),
        error,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    inputs: Vec<Value>,
    #[serde(default)]
    connections: Vec<UnitPayload>,
    #[serde(default)]
    biases: BTreeMap<String, Value>,
    #[serde(default)]
    lg_config: Vec<ConfigEntryPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitPayload {
    lg_id: String,
    #[serde(rename = "type")]
    unit_type: String,
    #[serde(default)]
    st_inputs: Vec<Value>,
    #[serde(default)]
    pt_inputs: Vec<Value>,
    #[serde(default)]
    iterations: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ConfigEntryPayload {
    #[serde(rename = "type")]
    unit_type: String,
    bias: Value,
}

impl TaskPayload {
    fn into_task(self) -> Result<Task> {
        let inputs = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_f64()
                    .ok_or_else(|| LgError::MalformedInput(format!("inputs[{}] is not a number: {}", i, v)))
            })
            .collect::<Result<Vec<_>>>()?;

        let connections = self
            .connections
            .into_iter()
            .map(UnitPayload::into_unit)
            .collect::<Result<Vec<_>>>()?;

        let biases = self
            .biases
            .into_iter()
            .map(|(lg_id, v)| -> Result<(String, Bias)> {
                let bias = decode_bias(&lg_id, &v)?;
                Ok((lg_id, bias))
            })
            .collect::<Result<BiasTable>>()?;

        let lg_config = self
            .lg_config
            .into_iter()
            .enumerate()
            .map(|(i, entry)| -> Result<LgConfigEntry> {
                let unit_type = entry.unit_type.parse::<UnitType>()?;
                let bias = integer(&entry.bias, &format!("lgConfig[{}].bias", i))?;
                Ok(LgConfigEntry::new(unit_type, bias))
            })
            .collect::<Result<Vec<_>>>()?;

        let network = NetworkConfig {
            inputs,
            connections,
            biases,
            lg_config,
        };

        Ok(match self.id {
            Some(id) if !id.is_empty() => Task::with_id(id, network),
            _ => Task::new(network),
        })
    }
}

impl UnitPayload {
    fn into_unit(self) -> Result<LgUnit> {
        let unit_type = self.unit_type.parse::<UnitType>()?;

        let st_inputs = integers(&self.st_inputs, &format!("{}.stInputs", self.lg_id))?;
        let pt_inputs = integers(&self.pt_inputs, &format!("{}.ptInputs", self.lg_id))?;

        let iterations = match &self.iterations {
            None | Some(Value::Null) => DEFAULT_ITERATIONS,
            Some(v) => {
                let n = integer(v, &format!("{}.iterations", self.lg_id))?;
                u32::try_from(n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| LgError::MalformedInput(format!("{}.iterations must be positive: {}", self.lg_id, n)))?
            }
        };

        Ok(LgUnit {
            lg_id: self.lg_id,
            unit_type,
            st_inputs,
            pt_inputs,
            iterations,
        })
    }
}

/// Accept integers and integer-valued floats, reject everything else
fn integer(value: &Value, field: &str) -> Result<i64> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }

    let Some(f) = value.as_f64() else {
        return Err(LgError::MalformedInput(format!("{} is not a number: {}", field, value)));
    };

    // i64::MAX is not representable as f64; the bound is exclusive
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(LgError::MalformedInput(format!("{} is not an integer: {}", field, value)))
    }
}

fn integers(values: &[Value], field: &str) -> Result<Vec<i64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| integer(v, &format!("{}[{}]", field, i)))
        .collect()
}

fn decode_bias(lg_id: &str, value: &Value) -> Result<Bias> {
    let as_bias = |v: &Value, name: &str| {
        integer(v, &format!("biases.{}{}", lg_id, name)).map_err(|e| match e {
            LgError::MalformedInput(msg) => LgError::InvalidBias(msg),
            other => other,
        })
    };

    match value {
        Value::Number(_) => Ok(Bias::Scalar(as_bias(value, "")?)),
        Value::Object(map) => match (map.get("b1"), map.get("b2")) {
            (Some(b1), Some(b2)) => Ok(Bias::Pair {
                b1: as_bias(b1, ".b1")?,
                b2: as_bias(b2, ".b2")?,
            }),
            _ => Err(LgError::InvalidBias(format!("biases.{} needs both b1 and b2", lg_id))),
        },
        other => Err(LgError::InvalidBias(format!("biases.{} is neither a number nor a pair: {}", lg_id, other))),
    }
}
