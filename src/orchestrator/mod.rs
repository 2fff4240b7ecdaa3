//! Orchestrator - top-level conductor for one prompt at a time
//!
//! Detects slash commands, classifies the prompt, drives the planner and
//! executor, reconciles side effects, writes knowledge back to memory, and
//! synthesizes the final response. Failure responses are factual and
//! itemized; the orchestrator never asks the LLM to explain a failure.

mod commands;
mod mode;

pub use commands::{CommandContext, SlashReply};
pub use mode::{detect_mode, is_information_query};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::{info, warn};

use crate::approval::ApprovalGate;
use crate::config::ExecutorConfig;
use crate::context::ExecutionContext;
use crate::domain::{
    ExecutionResult, TaskPlan, TrioMessage, TrioMessageKind, TrioRole, TrioTarget, generate_run_id,
};
use crate::error::AgentError;
use crate::events::{EventBus, EventEmitter};
use crate::executor::Executor;
use crate::llm::LlmClient;
use crate::memory::MemoryProvider;
use crate::planner::{Planner, SIMPLE_QUESTION_FRAMING};
use crate::tools::ToolRegistry;

/// Tools whose output counts as retrieved information for synthesis
const RETRIEVAL_TOOLS: &[&str] = &["memory_retrieval", "git", "read_file", "rg", "grep"];

/// Meta-prompt for the one planner retry the orchestrator allows
const SIMPLIFIED_META_PROMPT: &str = "Break this into simple steps; return JSON only.";

/// Final answer for one prompt
#[derive(Debug, Clone)]
pub struct OrchestratorResponse {
    pub success: bool,
    pub response: Option<String>,
    pub tools_used: Vec<String>,
    pub error: Option<String>,
    /// Set by `/quit` and `/exit`; the host loop should stop
    pub quit: bool,
}

impl OrchestratorResponse {
    fn success(response: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            tools_used,
            error: None,
            quit: false,
        }
    }

    fn failure(response: Option<String>, error: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self {
            success: false,
            response,
            tools_used,
            error: Some(error.into()),
            quit: false,
        }
    }
}

/// Top-level conductor
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    approval: Arc<ApprovalGate>,
    memory: Option<Arc<dyn MemoryProvider>>,
    bus: Arc<EventBus>,
    executor_config: ExecutorConfig,
    working_dir: PathBuf,
    monitoring: AtomicBool,
    runs_completed: AtomicUsize,
    trio_log: std::sync::Mutex<Vec<TrioMessage>>,
}

impl Orchestrator {
    /// Create an orchestrator over the shared components
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>, approval: Arc<ApprovalGate>, bus: Arc<EventBus>) -> Self {
        Self {
            llm,
            registry,
            approval,
            memory: None,
            bus,
            executor_config: ExecutorConfig::default(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            monitoring: AtomicBool::new(false),
            runs_completed: AtomicUsize::new(0),
            trio_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Attach a memory provider
    pub fn with_memory(mut self, memory: Arc<dyn MemoryProvider>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Override executor limits
    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    /// Override the working directory for execution contexts
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Enable monitoring attach at startup
    pub fn with_monitoring(self, enabled: bool) -> Self {
        self.monitoring.store(enabled, Ordering::SeqCst);
        self
    }

    /// The trio message log accumulated so far
    pub fn trio_log(&self) -> Vec<TrioMessage> {
        self.trio_log.lock().unwrap().clone()
    }

    /// Handle one prompt end to end
    pub async fn execute(&self, prompt: &str) -> OrchestratorResponse {
        let run_id = generate_run_id();
        let events = self.bus.emitter_for(&run_id);

        // Slash commands short-circuit: no planner, no executor, no memory
        if prompt.trim_start().starts_with('/') {
            return self.handle_slash_command(prompt, &events);
        }

        events.emit(crate::events::AgentEvent::OrchestrationStarted {
            run_id: run_id.clone(),
            prompt_summary: prompt.chars().take(120).collect(),
        });

        if prompt.trim().is_empty() {
            let err = AgentError::InvalidInput("empty prompt".to_string());
            return self.fail_run(&events, &err);
        }

        let mode = mode::detect_mode(prompt);
        events.status(format!("mode: {}", mode));
        if let Some(memory) = &self.memory {
            memory.set_mode(mode);
        }

        let info_query = mode::is_information_query(prompt);
        let framing = info_query.then_some(SIMPLE_QUESTION_FRAMING);

        let planner = Planner::new(self.llm.clone(), self.registry.clone(), self.memory.clone(), events.clone());

        // One planner attempt, then one retry with the simplified meta-prompt
        let plan = match planner.create_plan_framed(prompt, framing).await {
            Ok(plan) => plan,
            Err(first_err) => {
                warn!(error = %first_err, "execute: planner failed, retrying with simplified meta-prompt");
                events.status("planning failed, retrying with a simplified prompt");
                let simplified = format!("{} {}", SIMPLIFIED_META_PROMPT, prompt);
                match planner.create_plan_framed(&simplified, framing).await {
                    Ok(plan) => plan,
                    Err(retry_err) => return self.fail_run(&events, &retry_err),
                }
            }
        };

        let response = self.run_plan(&planner, plan, prompt, info_query, &events).await;
        self.runs_completed.fetch_add(1, Ordering::SeqCst);
        response
    }

    /// Steps after planning: execute, reconcile, persist, synthesize
    async fn run_plan(
        &self,
        planner: &Planner,
        plan: TaskPlan,
        prompt: &str,
        info_query: bool,
        events: &EventEmitter,
    ) -> OrchestratorResponse {
        // Pure reply: nothing to execute
        if plan.is_conversation() {
            let response = plan.conversation_response.clone().unwrap_or_default();
            if let Some(memory) = &self.memory
                && let Err(e) = memory.add_assistant_response(&response).await
            {
                warn!(error = %e, "run_plan: failed to record assistant response");
            }
            self.complete_run(events, true, &response);
            return OrchestratorResponse::success(response, Vec::new());
        }

        self.send_trio(
            events,
            TrioRole::Orchestrator,
            TrioTarget::Executor,
            TrioMessageKind::Status,
            format!("execute this plan ({} tasks)", plan.tasks.len()),
        );

        let executor = Executor::new(
            self.llm.clone(),
            self.registry.clone(),
            self.approval.clone(),
            self.executor_config.clone(),
            events.clone(),
        );

        let mut ctx = ExecutionContext::new(self.working_dir.clone());
        let results = executor.execute_plan(&plan, &mut ctx).await;

        self.send_trio(
            events,
            TrioRole::Executor,
            TrioTarget::Orchestrator,
            TrioMessageKind::Response,
            format!("{}/{} tasks succeeded", results.iter().filter(|r| r.success).count(), plan.tasks.len()),
        );

        self.persist_run(prompt, &plan, &results, events).await;

        let tools_used = collect_tools_used(&results);
        let all_succeeded = results.len() == plan.tasks.len() && results.iter().all(|r| r.success);

        if !all_succeeded {
            let response = failure_enumeration(&plan, &results);
            self.complete_run(events, false, &response);
            return OrchestratorResponse::failure(Some(response), "tool-failed", tools_used);
        }

        // Information query over retrieved data: one synthesis call that
        // must come back as a conversation reply
        if info_query && tools_used.iter().any(|tool| RETRIEVAL_TOOLS.contains(&tool.as_str())) {
            return match self.synthesize(planner, prompt, &results).await {
                Ok(answer) => {
                    self.complete_run(events, true, &answer);
                    OrchestratorResponse::success(answer, tools_used)
                }
                Err(e) => self.fail_run(events, &e),
            };
        }

        let response = format!("{}/{} operations completed.", results.len(), plan.tasks.len());
        if let Some(memory) = &self.memory
            && let Err(e) = memory.add_assistant_response(&response).await
        {
            warn!(error = %e, "run_plan: failed to record assistant response");
        }
        self.complete_run(events, true, &response);
        OrchestratorResponse::success(response, tools_used)
    }

    /// One additional planner call over the retrieved outputs
    ///
    /// A task-plan answer here is a hard error; the orchestrator never
    /// substitutes a paraphrase.
    async fn synthesize(&self, planner: &Planner, prompt: &str, results: &[ExecutionResult]) -> Result<String, AgentError> {
        let mut synthesis_prompt = format!("{}\n\nRetrieved information:\n", prompt);
        for result in results {
            if let Some(output) = &result.output {
                synthesis_prompt.push_str(output);
                synthesis_prompt.push('\n');
            }
        }

        let plan = planner.create_plan_framed(&synthesis_prompt, Some(SIMPLE_QUESTION_FRAMING)).await?;
        match plan.conversation_response {
            Some(answer) => Ok(answer),
            None => Err(AgentError::SynthesisFailed),
        }
    }

    /// Persist a knowledge record and a semantic chunk; never fatal
    async fn persist_run(&self, prompt: &str, plan: &TaskPlan, results: &[ExecutionResult], events: &EventEmitter) {
        let Some(memory) = &self.memory else {
            return;
        };

        let record = serde_json::json!({
            "prompt": prompt,
            "tasks": plan
                .tasks
                .iter()
                .map(|task| {
                    let success = results.iter().find(|r| r.task_id == task.id).map(|r| r.success);
                    serde_json::json!({
                        "description": task.description,
                        "tools": task.tools,
                        "success": success,
                    })
                })
                .collect::<Vec<_>>(),
            "timestamp_ms": crate::domain::now_ms(),
        });

        let key = format!("run:{}", events.run_id());
        match memory.store_knowledge(&key, &record.to_string(), "run").await {
            Ok(()) => events.memory_updated(&key),
            Err(e) => warn!(error = %e, "persist_run: knowledge write-back failed"),
        }

        let chunk = plan.tasks.iter().map(|t| t.description.as_str()).collect::<Vec<_>>().join("; ");
        let content = format!("request: {} | steps: {}", prompt, chunk);
        if let Err(e) = memory
            .store_chunk(
                &format!("runs/{}", events.run_id()),
                &content,
                "run-summary",
                serde_json::json!({"task_count": plan.tasks.len()}),
            )
            .await
        {
            warn!(error = %e, "persist_run: chunk write-back failed");
        }
    }

    /// Handle a slash command without involving the planner or executor
    fn handle_slash_command(&self, input: &str, events: &EventEmitter) -> OrchestratorResponse {
        let ctx = CommandContext {
            registry: &self.registry,
            approval: self.approval.decision(),
            monitoring_enabled: self.monitoring.load(Ordering::SeqCst),
            runs_completed: self.runs_completed.load(Ordering::SeqCst),
        };
        let reply = commands::handle(input, &ctx, &mut |enabled| {
            self.monitoring.store(enabled, Ordering::SeqCst);
        });

        self.complete_run(events, reply.success, &reply.text);
        OrchestratorResponse {
            success: reply.success,
            response: Some(reply.text.clone()),
            tools_used: Vec::new(),
            error: (!reply.success).then_some(reply.text),
            quit: reply.quit,
        }
    }

    /// Log a trio message and mirror it onto the bus
    fn send_trio(&self, events: &EventEmitter, from: TrioRole, to: TrioTarget, kind: TrioMessageKind, content: String) {
        let message = TrioMessage::new(from, to, kind, content);
        self.trio_log.lock().unwrap().push(message.clone());
        events.trio(message);
    }

    fn complete_run(&self, events: &EventEmitter, success: bool, response: &str) {
        info!(run_id = events.run_id(), success, "orchestration complete");
        events.emit(crate::events::AgentEvent::OrchestrationCompleted {
            run_id: events.run_id().to_string(),
            success,
            response_summary: response.chars().take(200).collect(),
        });
    }

    fn fail_run(&self, events: &EventEmitter, error: &AgentError) -> OrchestratorResponse {
        warn!(run_id = events.run_id(), kind = error.kind(), error = %error, "orchestration failed");
        events.emit(crate::events::AgentEvent::OrchestrationError {
            run_id: events.run_id().to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
        OrchestratorResponse::failure(None, format!("{}: {}", error.kind(), error), Vec::new())
    }
}

/// Union of tools used across results, first-use order, deduped
fn collect_tools_used(results: &[ExecutionResult]) -> Vec<String> {
    let mut tools = Vec::new();
    for result in results {
        for tool in &result.tools_used {
            if !tools.contains(tool) {
                tools.push(tool.clone());
            }
        }
    }
    tools
}

/// Factual failure enumeration: counts plus one ❌ line per failed task.
/// No prose, no suggestions - by contract.
fn failure_enumeration(plan: &TaskPlan, results: &[ExecutionResult]) -> String {
    let succeeded = results.iter().filter(|r| r.success).count();
    let mut response = format!("{}/{} tasks completed.", succeeded, plan.tasks.len());

    for result in results.iter().filter(|r| !r.success) {
        let description = plan
            .tasks
            .iter()
            .find(|task| task.id == result.task_id)
            .map(|task| task.description.as_str())
            .unwrap_or(result.task_id.as_str());
        response.push_str(&format!("\n❌ {}: {}", description, result.error.as_deref().unwrap_or("failed")));
    }

    response
}
