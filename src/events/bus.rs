//! Event bus - central pub/sub for agent activity
//!
//! Built on tokio broadcast channels: publish never blocks, slow subscribers
//! lag and catch up, and components emit through cheap cloneable
//! [`EventEmitter`] handles bound to a run ID.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::{AgentEvent, Envelope};
use crate::domain::{PlanComplexity, TrioMessage};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Central event bus for one agent process
///
/// Every significant action emits an event here. Consumers (CLI renderers,
/// monitoring sidecars, loggers) subscribe and receive [`Envelope`]s with a
/// monotonic sequence number.
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
    seq: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Publish an event to all subscribers
    ///
    /// Fire-and-forget: no subscribers is fine, and a full channel drops the
    /// oldest events rather than stalling the publisher.
    pub fn emit(&self, event: AgentEvent) {
        let envelope = Envelope {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            event,
        };
        debug!(event_type = envelope.event.event_type(), seq = envelope.seq, "EventBus::emit");
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Create an emitter handle bound to a run
    pub fn emitter_for(&self, run_id: impl Into<String>) -> EventEmitter {
        EventEmitter {
            tx: self.tx.clone(),
            seq: Arc::clone(&self.seq),
            run_id: run_id.into(),
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for components to emit events without owning the bus
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<Envelope>,
    seq: Arc<AtomicU64>,
    run_id: String,
}

impl EventEmitter {
    /// The run ID this emitter is bound to
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Rebind this emitter to a different run
    pub fn for_run(&self, run_id: impl Into<String>) -> Self {
        Self {
            tx: self.tx.clone(),
            seq: Arc::clone(&self.seq),
            run_id: run_id.into(),
        }
    }

    /// Emit a raw event
    pub fn emit(&self, event: AgentEvent) {
        let envelope = Envelope {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            event,
        };
        let _ = self.tx.send(envelope);
    }

    // === Convenience methods ===

    pub fn status(&self, message: impl Into<String>) {
        self.emit(AgentEvent::Status {
            run_id: self.run_id.clone(),
            message: message.into(),
        });
    }

    pub fn planning_started(&self, prompt_summary: &str) {
        self.emit(AgentEvent::PlanningStarted {
            run_id: self.run_id.clone(),
            prompt_summary: prompt_summary.to_string(),
        });
    }

    pub fn planning_completed(&self, task_count: usize, complexity: PlanComplexity, parallelizable: bool, conversation: bool) {
        self.emit(AgentEvent::PlanningCompleted {
            run_id: self.run_id.clone(),
            task_count,
            complexity,
            parallelizable,
            conversation,
        });
    }

    pub fn plan_started(&self, task_count: usize, parallel: bool) {
        self.emit(AgentEvent::PlanStarted {
            run_id: self.run_id.clone(),
            task_count,
            parallel,
        });
    }

    pub fn plan_completed(&self, succeeded: usize, failed: usize) {
        self.emit(AgentEvent::PlanCompleted {
            run_id: self.run_id.clone(),
            succeeded,
            failed,
        });
    }

    pub fn plan_error(&self, task_id: &str, message: &str) {
        self.emit(AgentEvent::PlanError {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            message: message.to_string(),
        });
    }

    pub fn task_started(&self, task_id: &str, description: &str) {
        self.emit(AgentEvent::TaskStarted {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            description: description.to_string(),
        });
    }

    pub fn task_completed(&self, task_id: &str, duration_ms: u64) {
        self.emit(AgentEvent::TaskCompleted {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            duration_ms,
        });
    }

    pub fn task_error(&self, task_id: &str, error: &str) {
        self.emit(AgentEvent::TaskError {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            error: error.to_string(),
        });
    }

    pub fn task_aborted(&self, task_id: &str) {
        self.emit(AgentEvent::TaskAborted {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
        });
    }

    pub fn tool_execute(&self, task_id: &str, tool: &str, args: &Value) {
        self.emit(AgentEvent::ToolExecute {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            tool: tool.to_string(),
            args_summary: summarize(&args.to_string(), 200),
        });
    }

    pub fn tool_result(&self, task_id: &str, tool: &str, success: bool, output: &str) {
        self.emit(AgentEvent::ToolResult {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            tool: tool.to_string(),
            success,
            output_summary: summarize(output, 200),
        });
    }

    pub fn tool_failure(&self, task_id: &str, tool: &str, error: &str) {
        self.emit(AgentEvent::ToolFailure {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            tool: tool.to_string(),
            error: error.to_string(),
        });
    }

    pub fn retry(&self, source: &str, attempt: u32, max_attempts: u32) {
        self.emit(AgentEvent::Retry {
            run_id: self.run_id.clone(),
            source: source.to_string(),
            attempt,
            max_attempts,
        });
    }

    pub fn timeout(&self, source: &str, after_ms: u64) {
        self.emit(AgentEvent::Timeout {
            run_id: self.run_id.clone(),
            source: source.to_string(),
            after_ms,
        });
    }

    pub fn token_usage(&self, input: u64, output: u64, total: u64) {
        self.emit(AgentEvent::TokenUsage {
            run_id: self.run_id.clone(),
            input,
            output,
            total,
        });
    }

    pub fn client_error(&self, message: &str, terminal: bool) {
        self.emit(AgentEvent::ClientError {
            run_id: self.run_id.clone(),
            message: message.to_string(),
            terminal,
        });
    }

    pub fn trio(&self, message: TrioMessage) {
        self.emit(AgentEvent::Trio {
            run_id: self.run_id.clone(),
            message,
        });
    }

    pub fn memory_updated(&self, key: &str) {
        self.emit(AgentEvent::MemoryUpdated {
            run_id: self.run_id.clone(),
            key: key.to_string(),
        });
    }
}

/// Truncate a string for event summaries
fn summarize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…", head)
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_bus_creation() {
        let bus = EventBus::new(100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emit_receive() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        bus.emit(AgentEvent::Status {
            run_id: "run-1".to_string(),
            message: "planning".to_string(),
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event.run_id(), "run-1");
        assert_eq!(envelope.seq, 0);
    }

    #[tokio::test]
    async fn test_sequence_numbers_monotonic() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("run-1");

        emitter.status("one");
        emitter.status("two");
        emitter.status("three");

        let mut last = None;
        for _ in 0..3 {
            let envelope = rx.recv().await.unwrap();
            if let Some(prev) = last {
                assert!(envelope.seq > prev);
            }
            last = Some(envelope.seq);
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(100);
        bus.emit(AgentEvent::Status {
            run_id: "run-1".to_string(),
            message: "no one listening".to_string(),
        });
    }

    #[tokio::test]
    async fn test_emitter_lifecycle_events() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("run-2");

        emitter.task_started("t1", "Create notes.txt");
        emitter.tool_execute("t1", "write_file", &serde_json::json!({"file_path": "notes.txt"}));
        emitter.tool_result("t1", "write_file", true, "File written: notes.txt");
        emitter.task_completed("t1", 42);

        let mut kinds = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            assert_eq!(envelope.event.run_id(), "run-2");
            kinds.push(envelope.event.event_type().to_string());
        }
        assert_eq!(kinds, vec!["TaskStarted", "ToolExecute", "ToolResult", "TaskCompleted"]);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_all_receive() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let emitter = bus.emitter_for("run-3");

        emitter.token_usage(100, 20, 120);

        assert_eq!(rx1.recv().await.unwrap().event.event_type(), "TokenUsage");
        assert_eq!(rx2.recv().await.unwrap().event.event_type(), "TokenUsage");
    }

    #[tokio::test]
    async fn test_lagged_subscriber_continues() {
        let bus = EventBus::new(5);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("run-4");

        for i in 0..10 {
            emitter.status(format!("line {}", i));
        }

        match rx.recv().await {
            Ok(envelope) => assert_eq!(envelope.event.event_type(), "Status"),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                assert!(n > 0);
                assert!(rx.recv().await.is_ok());
            }
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_emitter_rebind() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("run-a");
        let rebound = emitter.for_run("run-b");

        emitter.status("from a");
        rebound.status("from b");

        assert_eq!(rx.recv().await.unwrap().event.run_id(), "run-a");
        assert_eq!(rx.recv().await.unwrap().event.run_id(), "run-b");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_summarize_truncates() {
        let long = "x".repeat(500);
        let short = summarize(&long, 200);
        assert!(short.chars().count() <= 201);
        assert!(short.ends_with('…'));
        assert_eq!(summarize("short", 200), "short");
    }
}
