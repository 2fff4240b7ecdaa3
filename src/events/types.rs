//! Event types for agent activity streaming
//!
//! A closed vocabulary of everything observable during a run:
//! - orchestration lifecycle (start, complete, error)
//! - planning (start, complete)
//! - plan/task execution (start, complete, error, aborted)
//! - tool invocation (execute, result, failure)
//! - LLM client activity (retry, timeout, token usage, terminal errors)
//! - trio messages and memory updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PlanComplexity, TrioMessage};

/// Core event enum - the vocabulary of agent activity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    // === Orchestration lifecycle ===
    /// A run has started
    OrchestrationStarted { run_id: String, prompt_summary: String },
    /// A run has produced its final response
    OrchestrationCompleted {
        run_id: String,
        success: bool,
        response_summary: String,
    },
    /// A run failed before producing a response
    OrchestrationError {
        run_id: String,
        kind: String,
        message: String,
    },

    // === Planning ===
    /// The planner has started on a prompt
    PlanningStarted { run_id: String, prompt_summary: String },
    /// The planner returned a plan (or a conversation reply)
    PlanningCompleted {
        run_id: String,
        task_count: usize,
        complexity: PlanComplexity,
        parallelizable: bool,
        conversation: bool,
    },

    // === Plan execution ===
    /// Plan execution has started
    PlanStarted {
        run_id: String,
        task_count: usize,
        parallel: bool,
    },
    /// All tasks finished
    PlanCompleted {
        run_id: String,
        succeeded: usize,
        failed: usize,
    },
    /// Sequential execution stopped on a failed task
    PlanError {
        run_id: String,
        task_id: String,
        message: String,
    },

    // === Task lifecycle ===
    /// A task moved to running
    TaskStarted {
        run_id: String,
        task_id: String,
        description: String,
    },
    /// A task succeeded
    TaskCompleted {
        run_id: String,
        task_id: String,
        duration_ms: u64,
    },
    /// A task failed
    TaskError {
        run_id: String,
        task_id: String,
        error: String,
    },
    /// A task was cancelled externally
    TaskAborted { run_id: String, task_id: String },

    // === Tool invocation ===
    /// A tool is about to run
    ToolExecute {
        run_id: String,
        task_id: String,
        tool: String,
        args_summary: String,
    },
    /// A tool returned
    ToolResult {
        run_id: String,
        task_id: String,
        tool: String,
        success: bool,
        output_summary: String,
    },
    /// A tool returned a failure (before recovery)
    ToolFailure {
        run_id: String,
        task_id: String,
        tool: String,
        error: String,
    },

    // === LLM client ===
    /// A transient failure is being retried
    Retry {
        run_id: String,
        source: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// A call hit its deadline
    Timeout {
        run_id: String,
        source: String,
        after_ms: u64,
    },
    /// Token counts for one completed LLM call
    TokenUsage {
        run_id: String,
        input: u64,
        output: u64,
        total: u64,
    },
    /// LLM call failed; `terminal` means retries are exhausted
    ClientError {
        run_id: String,
        message: String,
        terminal: bool,
    },

    // === Coordination ===
    /// Human-readable progress line
    Status { run_id: String, message: String },
    /// Planner/Executor/Orchestrator traffic
    Trio { run_id: String, message: TrioMessage },
    /// A knowledge record was persisted to the memory provider
    MemoryUpdated { run_id: String, key: String },
}

impl AgentEvent {
    /// Get the run ID for this event
    pub fn run_id(&self) -> &str {
        match self {
            AgentEvent::OrchestrationStarted { run_id, .. }
            | AgentEvent::OrchestrationCompleted { run_id, .. }
            | AgentEvent::OrchestrationError { run_id, .. }
            | AgentEvent::PlanningStarted { run_id, .. }
            | AgentEvent::PlanningCompleted { run_id, .. }
            | AgentEvent::PlanStarted { run_id, .. }
            | AgentEvent::PlanCompleted { run_id, .. }
            | AgentEvent::PlanError { run_id, .. }
            | AgentEvent::TaskStarted { run_id, .. }
            | AgentEvent::TaskCompleted { run_id, .. }
            | AgentEvent::TaskError { run_id, .. }
            | AgentEvent::TaskAborted { run_id, .. }
            | AgentEvent::ToolExecute { run_id, .. }
            | AgentEvent::ToolResult { run_id, .. }
            | AgentEvent::ToolFailure { run_id, .. }
            | AgentEvent::Retry { run_id, .. }
            | AgentEvent::Timeout { run_id, .. }
            | AgentEvent::TokenUsage { run_id, .. }
            | AgentEvent::ClientError { run_id, .. }
            | AgentEvent::Status { run_id, .. }
            | AgentEvent::Trio { run_id, .. }
            | AgentEvent::MemoryUpdated { run_id, .. } => run_id,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::OrchestrationStarted { .. } => "OrchestrationStarted",
            AgentEvent::OrchestrationCompleted { .. } => "OrchestrationCompleted",
            AgentEvent::OrchestrationError { .. } => "OrchestrationError",
            AgentEvent::PlanningStarted { .. } => "PlanningStarted",
            AgentEvent::PlanningCompleted { .. } => "PlanningCompleted",
            AgentEvent::PlanStarted { .. } => "PlanStarted",
            AgentEvent::PlanCompleted { .. } => "PlanCompleted",
            AgentEvent::PlanError { .. } => "PlanError",
            AgentEvent::TaskStarted { .. } => "TaskStarted",
            AgentEvent::TaskCompleted { .. } => "TaskCompleted",
            AgentEvent::TaskError { .. } => "TaskError",
            AgentEvent::TaskAborted { .. } => "TaskAborted",
            AgentEvent::ToolExecute { .. } => "ToolExecute",
            AgentEvent::ToolResult { .. } => "ToolResult",
            AgentEvent::ToolFailure { .. } => "ToolFailure",
            AgentEvent::Retry { .. } => "Retry",
            AgentEvent::Timeout { .. } => "Timeout",
            AgentEvent::TokenUsage { .. } => "TokenUsage",
            AgentEvent::ClientError { .. } => "ClientError",
            AgentEvent::Status { .. } => "Status",
            AgentEvent::Trio { .. } => "Trio",
            AgentEvent::MemoryUpdated { .. } => "MemoryUpdated",
        }
    }
}

/// An event as delivered to subscribers: payload plus per-run ordering
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Monotonically increasing sequence number, assigned at publish
    pub seq: u64,

    /// Publish timestamp
    pub timestamp: DateTime<Utc>,

    /// The event payload
    pub event: AgentEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_accessor() {
        let event = AgentEvent::TaskStarted {
            run_id: "run-abc".to_string(),
            task_id: "t1".to_string(),
            description: "Create a file".to_string(),
        };
        assert_eq!(event.run_id(), "run-abc");
        assert_eq!(event.event_type(), "TaskStarted");
    }

    #[test]
    fn test_event_serde_tagged() {
        let event = AgentEvent::TokenUsage {
            run_id: "run-abc".to_string(),
            input: 100,
            output: 20,
            total: 120,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"TokenUsage\""));

        let back: AgentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "TokenUsage");
    }
}
