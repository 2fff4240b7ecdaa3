//! Run and task identifier generation
//!
//! Run IDs use the format `run-{8-char-hex}`; task IDs use
//! `task_{run-ts-ms}_{index}` so that tasks from the same planning pass sort
//! together.

use chrono::Utc;

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a run ID from a v7 UUID prefix
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::now_v7();
    format!("run-{}", &uuid.simple().to_string()[..8])
}

/// Generate a task ID for position `index` in the plan created at `run_ts`
pub fn task_id(run_ts: i64, index: usize) -> String {
    format!("task_{}_{}", run_ts, index)
}
