//! Task domain type
//!
//! A Task is a single unit of work bound to at most one tool and a set of
//! arguments. Tasks only exist inside a [`super::TaskPlan`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a task gets done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// No tool needed, the description is the work
    #[default]
    Simple,
    /// Bound to a single tool invocation
    Tool,
    /// Description implies several tool invocations
    MultiStep,
}

/// A single unit of work within a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique within the plan (e.g. "task_1700000000000_0")
    pub id: String,

    /// Human description of what this task accomplishes
    pub description: String,

    /// Task type; `Tool` iff `tools` is non-empty
    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// Tool names this task invokes, in order
    #[serde(default)]
    pub tools: Vec<String>,

    /// Per-tool argument records, keyed by tool name
    #[serde(default)]
    pub arguments: HashMap<String, Value>,

    /// IDs of sibling tasks that must succeed before this one starts.
    /// Every entry refers to a task appearing earlier in the same plan.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Declared order, 1-based
    pub priority: u32,
}

impl Task {
    /// Create a simple (tool-less) task
    pub fn simple(id: impl Into<String>, description: impl Into<String>, priority: u32) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            task_type: TaskType::Simple,
            tools: Vec::new(),
            arguments: HashMap::new(),
            dependencies: Vec::new(),
            priority,
        }
    }

    /// Create a tool-bound task
    pub fn with_tool(
        id: impl Into<String>,
        description: impl Into<String>,
        tool: impl Into<String>,
        priority: u32,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            task_type: TaskType::Tool,
            tools: vec![tool.into()],
            arguments: HashMap::new(),
            dependencies: Vec::new(),
            priority,
        }
    }

    /// Attach an argument record for a tool
    pub fn with_arguments(mut self, tool: impl Into<String>, args: Value) -> Self {
        self.arguments.insert(tool.into(), args);
        self
    }

    /// Add a dependency on an earlier task
    pub fn depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    /// The argument record the planner supplied for `tool`, if any
    pub fn arguments_for(&self, tool: &str) -> Option<&Value> {
        self.arguments.get(tool)
    }
}
