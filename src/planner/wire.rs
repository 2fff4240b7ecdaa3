//! Planner wire format
//!
//! The JSON shapes the LLM is instructed to return. Two envelopes:
//!
//! ```json
//! {"type":"conversation","response":"..."}
//! {"type":"tasks","plan":[{"id":"...","description":"...","tool":"...", ...}]}
//! ```
//!
//! For backward compatibility the task list is accepted under both `plan`
//! (preferred) and `tasks` (legacy), and the tool under both `tool`
//! (preferred) and `type` (legacy). A missing `content` field means
//! "generate at execution time".

use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level envelope returned by the LLM
#[derive(Debug, Deserialize)]
pub struct PlanEnvelope {
    /// "conversation" or "tasks"
    #[serde(rename = "type")]
    pub kind: String,

    /// Reply text for conversation envelopes
    pub response: Option<String>,

    /// Task list for tasks envelopes
    #[serde(alias = "tasks")]
    pub plan: Option<Vec<PlanEntry>>,
}

/// One task entry as the LLM wrote it
#[derive(Debug, Deserialize)]
pub struct PlanEntry {
    /// Provided ID, preserved verbatim when present
    pub id: Option<String>,

    /// Human description of the step
    pub description: String,

    /// Tool to invoke; inferred from the description when absent
    #[serde(alias = "type")]
    pub tool: Option<String>,

    /// Shell command, for bash entries
    pub command: Option<String>,

    /// Target path, for file entries
    #[serde(alias = "path")]
    pub file_path: Option<String>,

    /// File content; absence means "generate at execution time"
    pub content: Option<String>,

    /// IDs of earlier entries this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Any other tool-specific fields, carried into the argument record
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlanEnvelope {
    /// Parse an envelope from (already unfenced) JSON text
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
