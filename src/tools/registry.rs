//! ToolRegistry - name→tool lookup and uniform dispatch
//!
//! Registration happens during process init; after startup the registry is
//! read-only and shared behind an `Arc`. Iteration order is insertion order,
//! so planner prompts enumerate tools deterministically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{Tool, ToolOutcome, ToolSchema};

/// Default per-tool execution deadline
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from registry configuration
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate tool: {name}")]
    DuplicateTool { name: String },
}

/// Holds the mapping from tool name to tool
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Tool>>,
    default_timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry with the default tool timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TOOL_TIMEOUT)
    }

    /// Create an empty registry with a custom default timeout
    pub fn with_timeout(default_timeout: Duration) -> Self {
        Self {
            order: Vec::new(),
            tools: HashMap::new(),
            default_timeout,
        }
    }

    /// Insert a tool by unique name; replacing is disallowed
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool { name });
        }
        debug!(%name, "ToolRegistry::register");
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Schemas for every registered tool, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order.iter().filter_map(|name| self.tools.get(name)).map(|tool| tool.schema()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no tools are registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Execute a tool by name with a resolved argument record
    ///
    /// Never panics and never returns an `Err`: unknown tools, rejected
    /// arguments, deadline hits, and tool failures all come back as a
    /// failed [`ToolOutcome`].
    pub async fn execute(&self, name: &str, args: &Value) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            return ToolOutcome::err(format!("tool not found: {}", name));
        };

        if !tool.validate(args) {
            let reason = tool.schema().validate_args(args).err().unwrap_or_else(|| "rejected by tool".to_string());
            return ToolOutcome::err(format!("invalid arguments for {}: {}", name, reason));
        }

        let deadline = tool.timeout().unwrap_or(self.default_timeout);
        match tokio::time::timeout(deadline, tool.execute(args)).await {
            Ok(outcome) => outcome,
            Err(_) => ToolOutcome::err(format!("timeout after {}ms", deadline.as_millis())),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
