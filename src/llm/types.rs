//! LLM request/response types
//!
//! These model the OpenAI-compatible chat-completion wire shape but stay
//! provider-agnostic: the client decides how to put them on the wire.

use serde::{Deserialize, Serialize};

use crate::tools::ToolSchema;

/// Message role on the chat-completion wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation, preserved verbatim on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,

    /// Participant name, when the vendor supports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ties a tool-role message back to the call it answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            name: None,
            tool_call_id: None,
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            name: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            name: None,
            tool_call_id: None,
        }
    }
}

/// A chat request - everything needed for one LLM call
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Ordered messages, sent verbatim
    pub messages: Vec<ChatMessage>,

    /// Tool schemas to advertise as callable functions. The planner embeds
    /// tool descriptions textually instead and leaves this empty.
    pub tools: Vec<ToolSchema>,

    /// Demand raw JSON output (vendor JSON mode where available, outer
    /// code-fence stripping always)
    pub force_json: bool,

    /// Soft ceiling on output tokens; vendor default when absent
    pub max_tokens: Option<u32>,

    /// Sampling temperature; vendor default when absent
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Request with a single user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(text)],
            ..Default::default()
        }
    }

    /// Demand raw JSON output
    pub fn force_json(mut self) -> Self {
        self.force_json = true;
        self
    }

    /// Cap output tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token counts for one LLM call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}
