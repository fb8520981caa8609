//! Summary statistics over recent network outputs

use std::collections::HashMap;

use serde::Serialize;

/// Mean, median and mode of a non-empty history window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub count: usize,
    pub mean: f64,
    /// Element at `floor(n/2)` of the ascending sort (upper median)
    pub median: i64,
    /// Most frequent value; the first to reach the top count wins ties
    pub mode: i64,
}

impl HistoryStats {
    /// Compute statistics, or None for an empty history
    pub fn from_history(values: &[i64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        Some(Self {
            count: values.len(),
            mean: mean(values),
            median: upper_median(values),
            mode: mode(values),
        })
    }
}

fn mean(values: &[i64]) -> f64 {
    let total: i128 = values.iter().map(|v| *v as i128).sum();
    total as f64 / values.len() as f64
}

fn upper_median(values: &[i64]) -> i64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len() / 2]
}

fn mode(values: &[i64]) -> i64 {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut best = values[0];
    let mut best_count = 0;

    for v in values {
        let count = counts.entry(*v).or_insert(0);
        *count += 1;
        if *count > best_count {
            best = *v;
            best_count = *count;
        }
    }

    best
}
