//! Error taxonomy for the coordination engine
//!
//! Every failure that crosses a component boundary is one of these kinds.
//! The stable slug (see [`AgentError::kind`]) is what reaches users, logs,
//! and events - never the Rust type name.

use thiserror::Error;

use crate::llm::LlmError;

/// Errors surfaced by the Planner, Executor, and Orchestrator
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("planner failed twice to produce parseable JSON: {0}")]
    PlanInvalidJson(String),

    #[error("plan violates required shape: {0}")]
    PlanShapeInvalid(String),

    #[error("plan references unknown tool: {0}")]
    ToolNotFound(String),

    #[error("tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("aborted")]
    Aborted,

    #[error("approval denied for {0}")]
    ApprovalDenied(String),

    #[error("synthesis did not return a conversation reply")]
    SynthesisFailed,

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl AgentError {
    /// Stable error kind slug, used in events and user-visible messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid-input",
            Self::PlanInvalidJson(_) => "plan-invalid-json",
            Self::PlanShapeInvalid(_) => "plan-shape-invalid",
            Self::ToolNotFound(_) => "tool-not-found",
            Self::ToolFailed { .. } => "tool-failed",
            Self::Timeout(_) => "timeout",
            Self::Aborted => "aborted",
            Self::ApprovalDenied(_) => "approval-denied",
            Self::SynthesisFailed => "synthesis-failed",
            Self::Internal(_) => "internal",
            Self::Llm(e) => {
                if matches!(e, LlmError::Timeout(_)) {
                    "timeout"
                } else {
                    "tool-failed"
                }
            }
        }
    }
}
