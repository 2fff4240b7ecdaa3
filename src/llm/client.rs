//! LlmClient trait definition

use async_trait::async_trait;

use super::{ChatRequest, LlmError};

/// Stateless handle to a chat-completion endpoint
///
/// Each call is independent; no conversation state is kept between calls.
/// Implementations own their timeout and retry behavior and must never
/// mutate the request's message list. In JSON mode the returned string is
/// the response with outer code fences and framing stripped - structural
/// validity stays the caller's responsibility.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one chat request and return the assistant's text content
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;
}

/// Scripted LLM client for tests and offline embedding hosts
///
/// Replays a queue of canned responses in order and records every request
/// it receives for later assertion.
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub struct MockLlmClient {
        responses: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<ChatRequest>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        /// Create a client that replays `responses` in order
        pub fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Number of chat calls received so far
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Snapshot of every request received so far
        pub fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::InvalidResponse("mock response queue exhausted".to_string()))
        }
    }
}
