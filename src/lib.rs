//! Triad - a three-role coordination engine for LLM-driven task agents
//!
//! Triad turns a natural-language prompt into a validated, dependency-ordered
//! plan of atomic tasks, then executes those tasks against a registry of
//! side-effecting tools with retries, timeouts, approval gates, and
//! memory-backed context.
//!
//! # The trio
//!
//! - **Planner**: prompt → conversation reply or task plan (one JSON-mode
//!   LLM call, one retry, deterministic normalization)
//! - **Executor**: plan → results (argument resolution, per-task state
//!   machine, bounded recovery, sequential or parallel)
//! - **Orchestrator**: the conductor (slash commands, mode detection,
//!   synthesis, factual failure reporting)
//!
//! # Supporting substrates
//!
//! - [`llm`] - typed chat-completion client with retry/timeout/JSON mode
//! - [`tools`] - tool contracts and the registry (implementations live in
//!   the embedding host)
//! - [`events`] - typed event bus for observable progress
//! - [`approval`] - confirmation policy with injected UI capability
//! - [`memory`] - black-box memory provider interface
//!
//! The engine never invents answers on failure: failed runs produce a
//! factual, itemized report, not generated prose.

pub mod approval;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod events;
pub mod extract;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod planner;
pub mod tools;

mod executor;
pub use executor::{Executor, generate_file_content};

// Re-export commonly used types
pub use approval::{AllowAll, ApprovalDecision, ApprovalGate, ApprovalMode, Confirmer, DenyAll};
pub use config::{Config, ExecutorConfig, LlmConfig, MonitoringConfig};
pub use context::{ExecutionContext, TaskHistoryEntry, ToolExecutionRecord};
pub use domain::{
    ExecutionResult, Mode, PlanComplexity, Task, TaskPlan, TaskState, TaskType, TrioMessage, TrioMessageKind, TrioRole,
    TrioTarget,
};
pub use error::AgentError;
pub use events::{AgentEvent, Envelope, EventBus, EventEmitter};
pub use llm::{ChatMessage, ChatRequest, LlmClient, LlmError, OpenAiClient, RetryPolicy};
pub use memory::{MemoryComponents, MemoryProvider};
pub use orchestrator::{Orchestrator, OrchestratorResponse};
pub use planner::Planner;
pub use tools::{ConfirmationDetails, ParamKind, Tool, ToolOutcome, ToolParameter, ToolRegistry, ToolSchema};
