//! ExecutionContext - per-run mutable accumulator of side effects
//!
//! Owned by the Orchestrator, mutated only by the Executor between tasks,
//! read by argument-resolution helpers. Entries are appended in
//! task-execution order and never reordered or removed during a run.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ExecutionResult;

/// One line of the per-run task history log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    pub task_id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub tools_used: Vec<String>,
    /// Short result summary ("ok: File written: a.txt" / "failed: …")
    pub result: String,
    pub duration_ms: u64,
}

/// One tool invocation recorded under its task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionRecord {
    pub tool: String,
    pub args: Value,
    pub success: bool,
}

/// Per-run mutable accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Working directory for relative paths
    pub working_dir: PathBuf,

    /// Environment snapshot taken at run start
    pub environment: HashMap<String, String>,

    /// Outputs of prior tasks in this run, in execution order
    pub previous_results: Vec<ExecutionResult>,

    /// Files created by tasks in this run
    pub created_files: Vec<String>,

    /// Files modified by tasks in this run
    pub modified_files: Vec<String>,

    /// Files deleted by tasks in this run
    pub deleted_files: Vec<String>,

    /// Shell commands executed
    pub executed_commands: Vec<String>,

    /// Web searches performed
    pub web_searches: Vec<String>,

    /// Tool invocations keyed by task id
    pub tool_executions: HashMap<String, Vec<ToolExecutionRecord>>,

    /// Append-only history log
    pub task_history: Vec<TaskHistoryEntry>,
}

impl ExecutionContext {
    /// Create a context rooted at `working_dir` with an environment snapshot
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            environment: std::env::vars().collect(),
            previous_results: Vec::new(),
            created_files: Vec::new(),
            modified_files: Vec::new(),
            deleted_files: Vec::new(),
            executed_commands: Vec::new(),
            web_searches: Vec::new(),
            tool_executions: HashMap::new(),
            task_history: Vec::new(),
        }
    }

    /// Create a context for the current directory
    pub fn current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Record a created file, dedup by path
    pub fn note_created_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.created_files.contains(&path) {
            self.created_files.push(path);
        }
    }

    /// Record a modified file, dedup by path
    pub fn note_modified_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.modified_files.contains(&path) {
            self.modified_files.push(path);
        }
    }

    /// Record an executed shell command
    pub fn note_command(&mut self, command: impl Into<String>) {
        self.executed_commands.push(command.into());
    }

    /// Record a web search query
    pub fn note_web_search(&mut self, query: impl Into<String>) {
        self.web_searches.push(query.into());
    }

    /// Record one tool invocation under its task
    pub fn record_tool_execution(&mut self, task_id: &str, record: ToolExecutionRecord) {
        self.tool_executions.entry(task_id.to_string()).or_default().push(record);
    }

    /// Append a task result and its history entry
    pub fn record_result(&mut self, description: &str, result: ExecutionResult) {
        self.task_history.push(TaskHistoryEntry {
            task_id: result.task_id.clone(),
            description: description.to_string(),
            timestamp: Utc::now(),
            tools_used: result.tools_used.clone(),
            result: match (&result.success, &result.output, &result.error) {
                (true, Some(output), _) => format!("ok: {}", output.chars().take(120).collect::<String>()),
                (true, None, _) => "ok".to_string(),
                (false, _, Some(error)) => format!("failed: {}", error),
                (false, _, None) => "failed".to_string(),
            },
            duration_ms: result.duration_ms,
        });
        self.previous_results.push(result);
    }

    /// The most recently created file, if any
    pub fn last_created_file(&self) -> Option<&str> {
        self.created_files.last().map(String::as_str)
    }

    /// Result for a specific task, if it ran
    pub fn result_for(&self, task_id: &str) -> Option<&ExecutionResult> {
        self.previous_results.iter().find(|r| r.task_id == task_id)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::current_dir()
    }
}
