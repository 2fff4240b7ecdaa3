//! Execution state and results

use serde::{Deserialize, Serialize};

/// Per-task state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl TaskState {
    /// True once the task can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }
}

/// Outcome of one task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Task this result belongs to
    pub task_id: String,

    /// Whether the task succeeded
    pub success: bool,

    /// Tool output, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Tools actually invoked
    pub tools_used: Vec<String>,

    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Successful result with output
    pub fn success(task_id: impl Into<String>, output: impl Into<String>, tools_used: Vec<String>, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            tools_used,
            duration_ms,
        }
    }

    /// Failed result with error message
    pub fn failure(task_id: impl Into<String>, error: impl Into<String>, tools_used: Vec<String>, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: None,
            error: Some(error.into()),
            tools_used,
            duration_ms,
        }
    }

    /// Result for an externally cancelled task
    pub fn aborted(task_id: impl Into<String>, duration_ms: u64) -> Self {
        Self::failure(task_id, "aborted", Vec::new(), duration_ms)
    }
}
