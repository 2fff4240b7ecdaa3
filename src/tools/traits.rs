//! Tool trait definition

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::ToolSchema;

/// A named, schema-typed capability the executor can invoke
///
/// Concrete tools (bash, file, web, git, …) live in the embedding host and
/// are registered at process init; the core only sees this contract.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as referenced by plans
    fn name(&self) -> &str;

    /// Human-readable description, shown to the planner
    fn description(&self) -> &str;

    /// Parameter schema
    fn schema(&self) -> ToolSchema;

    /// Execute with a resolved argument record
    async fn execute(&self, args: &Value) -> ToolOutcome;

    /// Check an argument record before execution.
    /// Defaults to schema validation.
    fn validate(&self, args: &Value) -> bool {
        self.schema().validate_args(args).is_ok()
    }

    /// Whether this invocation needs external confirmation
    fn should_confirm(&self, _args: &Value) -> Option<ConfirmationDetails> {
        None
    }

    /// Per-tool deadline override; the registry default applies when absent
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// Structured result of one tool invocation. Tools never panic or throw
/// past this boundary.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Successful outcome with output
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Failed outcome with an error message
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// The error message, or empty when successful
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

/// What the approval gate shows before a guarded operation runs
#[derive(Debug, Clone)]
pub struct ConfirmationDetails {
    /// One-line summary, e.g. `Write(notes.txt)`
    pub summary: String,

    /// Longer explanation when the summary is not enough
    pub detail: Option<String>,

    /// Affected filesystem path, when there is one
    pub path: Option<String>,
}

impl ConfirmationDetails {
    /// Create details with just a summary
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: None,
            path: None,
        }
    }

    /// Attach the affected path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}
