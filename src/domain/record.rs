//! Persisted result records
//!
//! A ResultRecord is written once per processed delivery of a task and never
//! updated. It carries the pre-adaptation `O_final` next to the adapted
//! connection list, so the next submitter can pick up the grown network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::network::LgConfigEntry;
use super::unit::LgUnit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "taskId")]
    pub task_id: String,

    #[serde(rename = "O_final")]
    pub o_final: i64,

    pub inputs: Vec<f64>,

    pub connections: Vec<LgUnit>,

    #[serde(rename = "lgConfig")]
    pub lg_config: Vec<LgConfigEntry>,

    pub timestamp: DateTime<Utc>,
}

impl ResultRecord {
    /// Create a record stamped with the current time
    pub fn new(
        task_id: impl Into<String>,
        o_final: i64,
        inputs: Vec<f64>,
        connections: Vec<LgUnit>,
        lg_config: Vec<LgConfigEntry>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            o_final,
            inputs,
            connections,
            lg_config,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Milliseconds since the Unix epoch, the store's ordering key
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::UnitType;

    #[test]
    fn test_result_record_wire_field_names() {
        let record = ResultRecord::new(
            "t1",
            4,
            vec![],
            vec![LgUnit::simple("u1", vec![10], vec![3])],
            vec![LgConfigEntry::new(UnitType::Looped, 3)],
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["taskId"], "t1");
        assert_eq!(json["O_final"], 4);
        assert_eq!(json["lgConfig"][0]["bias"], 3);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_timestamp_ms() {
        let ts = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let record = ResultRecord::new("t", 0, vec![], vec![], vec![]).with_timestamp(ts);
        assert_eq!(record.timestamp_ms(), 1_700_000_000_123);
    }
}
