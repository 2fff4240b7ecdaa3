//! Domain types for plans, tasks, and trio coordination

mod execution;
mod id;
mod plan;
mod task;
mod trio;

pub use execution::{ExecutionResult, TaskState};
pub use id::{generate_run_id, now_ms, task_id};
pub use plan::{PlanComplexity, TaskPlan};
pub use task::{Task, TaskType};
pub use trio::{TrioMessage, TrioMessageKind, TrioRole, TrioTarget};

use serde::{Deserialize, Serialize};

/// Pacing hint detected from the prompt
///
/// Mode influences token budgets and memory retrieval depth, never behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Short prompt, answer directly
    Direct,
    /// Everyday request
    #[default]
    Concise,
    /// Prompt asks for depth or breadth
    Deep,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Concise => write!(f, "concise"),
            Self::Deep => write!(f, "deep"),
        }
    }
}
