//! MemoryProvider - black-box interface to the external memory store
//!
//! The core never computes embeddings or persists anything itself. When a
//! provider is attached it enriches planner prompts and receives knowledge
//! write-backs; every call is best-effort and a failing provider never
//! fails a run.

use async_trait::async_trait;
use eyre::Result;
use serde_json::Value;

use crate::domain::Mode;

/// Retrieved context segments to prepend to a planner prompt
#[derive(Debug, Clone, Default)]
pub struct MemoryComponents {
    /// Short-lived conversational context
    pub ephemeral: Vec<String>,

    /// Long-lived knowledge records relevant to the prompt
    pub knowledge: Vec<String>,
}

impl MemoryComponents {
    /// True when retrieval found nothing
    pub fn is_empty(&self) -> bool {
        self.ephemeral.is_empty() && self.knowledge.is_empty()
    }
}

/// External memory/embedding store, consumed as a black box
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    /// Configure the pacing mode for this run
    fn set_mode(&self, mode: Mode);

    /// Retrieve context segments for a prompt
    async fn build_prompt(&self, prompt: &str) -> Result<MemoryComponents>;

    /// Persist a knowledge record
    async fn store_knowledge(&self, key: &str, value: &str, category: &str) -> Result<()>;

    /// Persist a semantic chunk for later retrieval
    async fn store_chunk(&self, path: &str, content: &str, kind: &str, metadata: Value) -> Result<()>;

    /// Record an assistant response in conversational memory
    async fn add_assistant_response(&self, text: &str) -> Result<()>;

    /// Account tokens consumed against the provider's budget
    async fn track_api_tokens(&self, n: u64) -> Result<()>;
}
