//! Trio messages - structured log of Planner/Executor/Orchestrator traffic

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::now_ms;

/// One of the three coordinating roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrioRole {
    Planner,
    Executor,
    Orchestrator,
}

/// Recipient of a trio message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrioTarget {
    Planner,
    Executor,
    Orchestrator,
    All,
}

/// What kind of traffic this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrioMessageKind {
    Question,
    Response,
    Adjustment,
    Status,
    Error,
}

/// A single entry in the per-run trio log. Append-only within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrioMessage {
    pub from: TrioRole,
    pub to: TrioTarget,
    pub kind: TrioMessageKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub timestamp_ms: i64,
}

impl TrioMessage {
    /// Create a message with the current timestamp
    pub fn new(from: TrioRole, to: TrioTarget, kind: TrioMessageKind, content: impl Into<String>) -> Self {
        Self {
            from,
            to,
            kind,
            content: content.into(),
            data: None,
            timestamp_ms: now_ms(),
        }
    }

    /// Attach a structured payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}
