//! LLM client: the single typed conduit to the chat-completion endpoint

mod client;
mod error;
mod openai;
mod retry;
mod types;

pub use client::{LlmClient, mock};
pub use error::LlmError;
pub use openai::{OpenAiClient, strip_json_framing};
pub use retry::RetryPolicy;
pub use types::{ChatMessage, ChatRequest, Role, TokenCounts};
