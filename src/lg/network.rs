//! Network evaluation
//!
//! A network's output is the sum of its units' `O` values. Each unit looks
//! up its bias by `lgId`; a missing or mismatched bias fails the whole
//! network instead of contributing zero.

use log::debug;
use serde::Serialize;

use super::evaluator::{LgResult, SimpleTrace, associated_lg, looped_lg, simple_trace};
use crate::domain::{Bias, BiasTable, LgUnit, UnitType};
use crate::error::{LgError, Result};

/// Output of one unit within a network evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOutput {
    pub lg_id: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    #[serde(flatten)]
    pub result: LgResult,
    /// Intermediate values, kept for simple units only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<SimpleTrace>,
}

/// A network total together with its per-unit breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkEvaluation {
    pub total: i64,
    pub units: Vec<UnitOutput>,
}

fn scalar_bias(unit: &LgUnit, biases: &BiasTable) -> Result<i64> {
    match lookup(unit, biases)? {
        Bias::Scalar(b) => nonzero(unit, *b),
        other => Err(shape_mismatch(unit, "scalar", other)),
    }
}

fn pair_bias(unit: &LgUnit, biases: &BiasTable) -> Result<(i64, i64)> {
    match lookup(unit, biases)? {
        Bias::Pair { b1, b2 } => Ok((nonzero(unit, *b1)?, nonzero(unit, *b2)?)),
        other => Err(shape_mismatch(unit, "pair", other)),
    }
}

fn lookup<'a>(unit: &LgUnit, biases: &'a BiasTable) -> Result<&'a Bias> {
    biases
        .get(&unit.lg_id)
        .ok_or_else(|| LgError::InvalidBias(format!("no bias for unit {}", unit.lg_id)))
}

fn nonzero(unit: &LgUnit, b: i64) -> Result<i64> {
    if b == 0 {
        Err(LgError::InvalidBias(format!("{}: bias must be nonzero", unit.lg_id)))
    } else {
        Ok(b)
    }
}

fn shape_mismatch(unit: &LgUnit, expected: &str, got: &Bias) -> LgError {
    LgError::InvalidBias(format!(
        "{}: {} unit needs a {} bias, got a {}",
        unit.lg_id,
        unit.unit_type,
        expected,
        got.shape()
    ))
}

fn evaluate_traced(unit: &LgUnit, biases: &BiasTable) -> Result<(LgResult, Option<SimpleTrace>)> {
    let evaluated = match unit.unit_type {
        UnitType::Simple => simple_trace(&unit.st_inputs, &unit.pt_inputs, scalar_bias(unit, biases)?)
            .map(|trace| (trace.result(), Some(trace))),
        UnitType::Associated => {
            let (b1, b2) = pair_bias(unit, biases)?;
            associated_lg(&unit.st_inputs, &unit.pt_inputs, b1, b2).map(|r| (r, None))
        }
        UnitType::Looped => looped_lg(
            &unit.st_inputs,
            &unit.pt_inputs,
            scalar_bias(unit, biases)?,
            unit.iterations,
        )
        .map(|r| (r, None)),
    }
    .map_err(|e| match e {
        LgError::MalformedInput(msg) => LgError::MalformedInput(format!("{}: {}", unit.lg_id, msg)),
        other => other,
    })?;

    let (result, _) = &evaluated;
    debug!(
        "unit {} ({}) -> O={} Q={} Q2={}",
        unit.lg_id, unit.unit_type, result.o, result.q, result.q2
    );
    Ok(evaluated)
}

/// Evaluate a single unit against the bias table
pub fn evaluate_unit(unit: &LgUnit, biases: &BiasTable) -> Result<LgResult> {
    evaluate_traced(unit, biases).map(|(result, _)| result)
}

/// Evaluate every unit and keep the breakdown
pub fn evaluate_network(connections: &[LgUnit], biases: &BiasTable) -> Result<NetworkEvaluation> {
    let mut total = 0i64;
    let mut units = Vec::with_capacity(connections.len());

    for unit in connections {
        let (result, trace) = evaluate_traced(unit, biases)?;
        total = total
            .checked_add(result.o)
            .ok_or_else(|| LgError::MalformedInput("integer overflow in network sum".to_string()))?;
        units.push(UnitOutput {
            lg_id: unit.lg_id.clone(),
            unit_type: unit.unit_type,
            result,
            trace,
        });
    }

    Ok(NetworkEvaluation { total, units })
}

/// Sum of every unit's `O`; an empty network is 0
pub fn compute_network(connections: &[LgUnit], biases: &BiasTable) -> Result<i64> {
    evaluate_network(connections, biases).map(|e| e.total)
}
