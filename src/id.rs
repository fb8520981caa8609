//! ID generation utilities for lgnet
//!
//! Provides functions for generating unique identifiers for tasks and
//! adaptation-grown units.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique task ID
///
/// Format: `task-{timestamp_ms}-{random_hex}`
/// Example: `task-1738300800123-a1b2`
pub fn generate_task_id() -> String {
    let random: u16 = rand::rng().random();
    format!("task-{}-{:04x}", now_ms(), random)
}

/// Generate an lgId for a unit appended by adaptation
///
/// Format: `lg{timestamp_ms}-{random_hex}`
///
/// The random suffix keeps ids distinct when concurrent tasks grow the
/// network within the same millisecond.
pub fn generate_lg_id() -> String {
    let random: u16 = rand::rng().random();
    format!("lg{}-{:04x}", now_ms(), random)
}
