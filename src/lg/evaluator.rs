//! LG unit arithmetic
//!
//! Pure integer functions for the three unit variants. All steps use
//! checked arithmetic; an overflow is reported as `MalformedInput` rather
//! than wrapping.

use serde::{Deserialize, Serialize};

use crate::error::{LgError, Result};

/// Output of evaluating one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LgResult {
    #[serde(rename = "O")]
    pub o: i64,
    #[serde(rename = "Q")]
    pub q: i64,
    #[serde(rename = "Q2")]
    pub q2: i64,
}

/// Every intermediate value of a simple pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct SimpleTrace {
    pub i1: i64,
    pub i2: i64,
    pub q1: i64,
    /// Remainder of `i1 / b`, after the zero-remainder rule
    pub r1: i64,
    pub q2: i64,
    pub r2: i64,
    pub q: i64,
    pub o: i64,
}

impl SimpleTrace {
    pub fn result(&self) -> LgResult {
        LgResult {
            o: self.o,
            q: self.q,
            q2: self.q2,
        }
    }
}

fn overflow(step: &str) -> LgError {
    LgError::MalformedInput(format!("integer overflow in {}", step))
}

/// Sum of the state inputs; empty sum is 0
pub fn sum(values: &[i64]) -> Result<i64> {
    values
        .iter()
        .try_fold(0i64, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| overflow("sum"))
}

/// Product of the pass-through inputs; empty product is 1
pub fn product(values: &[i64]) -> Result<i64> {
    values
        .iter()
        .try_fold(1i64, |acc, v| acc.checked_mul(*v))
        .ok_or_else(|| overflow("product"))
}

/// Division rounded toward negative infinity
fn floor_div(a: i64, b: i64, step: &str) -> Result<i64> {
    let q = a.checked_div(b).ok_or_else(|| overflow(step))?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Remainder carrying the dividend's sign
fn rem(a: i64, b: i64, step: &str) -> Result<i64> {
    a.checked_rem(b).ok_or_else(|| overflow(step))
}

/// Run a simple pass and keep every intermediate value
pub fn simple_trace(st_inputs: &[i64], pt_inputs: &[i64], b: i64) -> Result<SimpleTrace> {
    if b == 0 {
        return Err(LgError::InvalidBias("bias must be nonzero".to_string()));
    }

    let i1 = sum(st_inputs)?;
    let i2 = product(pt_inputs)?;

    let q1 = floor_div(i1, b, "I1 / b")?;
    let mut r1 = rem(i1, b, "I1 mod b")?;
    if r1 == 0 {
        r1 = 1;
    }

    let q2 = floor_div(i2, r1, "I2 / R1")?;
    let r2 = rem(i2, r1, "I2 mod R1")?;

    let q = q1.checked_add(r2).ok_or_else(|| overflow("Q1 + R2"))?;
    let o = q.checked_add(q2).ok_or_else(|| overflow("Q + Q2"))?;

    Ok(SimpleTrace {
        i1,
        i2,
        q1,
        r1,
        q2,
        r2,
        q,
        o,
    })
}

pub fn simple_lg(st_inputs: &[i64], pt_inputs: &[i64], b: i64) -> Result<LgResult> {
    simple_trace(st_inputs, pt_inputs, b).map(|t| t.result())
}

/// Two chained simple passes; the second takes `[Q2]` as state and `[Q]`
/// as pass-through input from the first
pub fn associated_lg(st_inputs: &[i64], pt_inputs: &[i64], b1: i64, b2: i64) -> Result<LgResult> {
    let first = simple_lg(st_inputs, pt_inputs, b1)?;
    simple_lg(&[first.q2], &[first.q], b2)
}

/// Feed a simple pass back into itself exactly `iterations` times
pub fn looped_lg(st_inputs: &[i64], pt_inputs: &[i64], b: i64, iterations: u32) -> Result<LgResult> {
    if iterations == 0 {
        return Err(LgError::MalformedInput("looped unit needs at least one iteration".to_string()));
    }

    let mut i1 = sum(st_inputs)?;
    let mut i2 = product(pt_inputs)?;
    let mut last = simple_lg(&[i1], &[i2], b)?;

    for _ in 1..iterations {
        i1 = last.q2;
        i2 = last.q;
        last = simple_lg(&[i1], &[i2], b)?;
    }

    Ok(last)
}
