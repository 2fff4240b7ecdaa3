//! Planner - turns a prompt into a conversation reply or a task plan
//!
//! One LLM call in JSON mode, one retry with a simplified prompt on parse
//! failure, then deterministic normalization: tool inference, argument
//! building, ID assignment, dependency inference, and complexity
//! classification. The planner never returns a partial plan - structural
//! errors throw.

mod wire;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::domain::{PlanComplexity, Task, TaskPlan, TaskType, generate_run_id, now_ms, task_id};
use crate::error::AgentError;
use crate::events::EventEmitter;
use crate::extract;
use crate::llm::{ChatRequest, LlmClient};
use crate::memory::MemoryProvider;
use crate::tools::ToolRegistry;
use wire::{PlanEntry, PlanEnvelope};

/// Framing line the orchestrator prepends for information queries
pub const SIMPLE_QUESTION_FRAMING: &str =
    "SIMPLE QUESTION: prefer a conversation response that answers directly; only plan tasks if tools are truly required.";

/// Transforms prompts into task plans
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    memory: Option<Arc<dyn MemoryProvider>>,
    events: EventEmitter,
}

impl Planner {
    /// Create a planner over the shared components
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        memory: Option<Arc<dyn MemoryProvider>>,
        events: EventEmitter,
    ) -> Self {
        Self {
            llm,
            registry,
            memory,
            events,
        }
    }

    /// Create a plan for a prompt
    pub async fn create_plan(&self, prompt: &str) -> Result<TaskPlan, AgentError> {
        self.create_plan_framed(prompt, None).await
    }

    /// Create a plan with an optional framing line prepended to the prompt
    pub async fn create_plan_framed(&self, prompt: &str, framing: Option<&str>) -> Result<TaskPlan, AgentError> {
        if prompt.trim().is_empty() {
            return Err(AgentError::InvalidInput("empty prompt".to_string()));
        }

        self.events.planning_started(&prompt.chars().take(120).collect::<String>());

        let context = self.assemble_context(prompt).await;
        let message = self.build_plan_prompt(prompt, framing, &context);

        let raw = self.llm.chat(ChatRequest::user(message).force_json()).await?;

        let envelope = match PlanEnvelope::parse(&raw) {
            Ok(envelope) => envelope,
            Err(first_err) => {
                debug!(error = %first_err, "create_plan: first parse failed, retrying with simplified prompt");
                self.events.status("plan response was not valid JSON, retrying");

                let retry_message = self.build_simplified_prompt(prompt, framing);
                let raw = self.llm.chat(ChatRequest::user(retry_message).force_json()).await?;
                PlanEnvelope::parse(&raw).map_err(|e| AgentError::PlanInvalidJson(e.to_string()))?
            }
        };

        let plan = self.build_plan(prompt, envelope)?;
        plan.validate()?;

        info!(
            plan_id = %plan.id,
            task_count = plan.tasks.len(),
            complexity = %plan.complexity,
            conversation = plan.is_conversation(),
            "create_plan: plan ready"
        );
        self.events
            .planning_completed(plan.tasks.len(), plan.complexity, plan.parallelizable, plan.is_conversation());

        Ok(plan)
    }

    /// Fetch memory segments; retrieval is never required for correctness
    async fn assemble_context(&self, prompt: &str) -> Vec<String> {
        let Some(memory) = &self.memory else {
            return Vec::new();
        };
        match memory.build_prompt(prompt).await {
            Ok(components) => {
                let mut segments = components.ephemeral;
                segments.extend(components.knowledge);
                segments
            }
            Err(e) => {
                warn!(error = %e, "assemble_context: memory retrieval failed, proceeding without");
                Vec::new()
            }
        }
    }

    /// Build the single user message for the planning call
    fn build_plan_prompt(&self, prompt: &str, framing: Option<&str>, context: &[String]) -> String {
        let mut message = String::new();

        if let Some(framing) = framing {
            message.push_str(framing);
            message.push_str("\n\n");
        }

        if !context.is_empty() {
            message.push_str("Context from memory:\n");
            for segment in context {
                message.push_str(segment);
                message.push('\n');
            }
            message.push('\n');
        }

        message.push_str("User request:\n");
        message.push_str(prompt);
        message.push_str("\n\nAvailable tools:\n");
        for schema in self.registry.schemas() {
            message.push_str(&schema.render_for_prompt());
            message.push('\n');
        }

        message.push_str(
            r#"
Respond with ONLY JSON, no prose, in exactly one of these two shapes.

For a question or chat that needs no tools:
{"type":"conversation","response":"<your answer>"}

For work that needs tools:
{"type":"tasks","plan":[{"id":"<optional>","description":"<what this step does>","tool":"<tool name>","command":"<for bash>","file_path":"<for file tools>","content":"<for file tools, omit to generate later>","dependencies":["<earlier task ids>"]}]}

Rules:
- one tool per task, tasks in execution order
- dependencies may only reference earlier tasks
- omit "content" when the file content should be generated at execution time
"#,
        );

        message
    }

    /// Second-attempt prompt: restate the shape, forbid prose
    fn build_simplified_prompt(&self, prompt: &str, framing: Option<&str>) -> String {
        format!(
            "{}Return ONLY a JSON object, no prose and no code fences.\n\
             Either {{\"type\":\"conversation\",\"response\":\"...\"}} or \
             {{\"type\":\"tasks\",\"plan\":[{{\"description\":\"...\",\"tool\":\"...\"}}]}}.\n\n\
             Request: {}",
            framing.map(|f| format!("{}\n\n", f)).unwrap_or_default(),
            prompt
        )
    }

    /// Convert a parsed envelope into a validated TaskPlan
    fn build_plan(&self, prompt: &str, envelope: PlanEnvelope) -> Result<TaskPlan, AgentError> {
        let plan_id = generate_run_id();

        match envelope.kind.as_str() {
            "conversation" => {
                let response = envelope
                    .response
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| AgentError::PlanShapeInvalid("conversation envelope without response".to_string()))?;
                Ok(TaskPlan::conversation(plan_id, prompt, response))
            }
            "tasks" => {
                let entries = envelope
                    .plan
                    .filter(|entries| !entries.is_empty())
                    .ok_or_else(|| AgentError::PlanShapeInvalid("tasks envelope without plan entries".to_string()))?;

                let tasks = normalize_entries(entries);
                Ok(TaskPlan::tasks(plan_id, prompt, tasks, classify_complexity(prompt)))
            }
            other => Err(AgentError::PlanShapeInvalid(format!("unknown envelope type '{}'", other))),
        }
    }
}

/// Normalize plan entries into tasks: tool inference, argument building,
/// ID assignment, and dependency inference
fn normalize_entries(entries: Vec<PlanEntry>) -> Vec<Task> {
    let run_ts = now_ms();
    let mut tasks: Vec<Task> = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let id = entry.id.clone().unwrap_or_else(|| task_id(run_ts, index));

        let mut tools: Vec<String> = match &entry.tool {
            Some(tool) if !tool.is_empty() => vec![tool.clone()],
            _ => extract::infer_tools(&entry.description),
        };
        tools.dedup();

        let task_type = match tools.len() {
            0 => TaskType::Simple,
            1 => TaskType::Tool,
            _ => TaskType::MultiStep,
        };

        let mut dependencies = entry.dependencies.clone();
        if dependencies.is_empty()
            && index > 0
            && extract::has_anaphoric_reference(&entry.description)
            && let Some(previous) = tasks.last()
        {
            debug!(task = %id, "normalize_entries: inferred dependency on previous task");
            dependencies.push(previous.id.clone());
        }

        let mut task = Task {
            id,
            description: entry.description.clone(),
            task_type,
            tools: tools.clone(),
            arguments: Default::default(),
            dependencies,
            priority: (index + 1) as u32,
        };

        for tool in &tools {
            if let Some(args) = build_arguments(tool, &entry) {
                task.arguments.insert(tool.clone(), args);
            }
        }

        tasks.push(task);
    }

    tasks
}

/// Build the initial argument record for one tool from a plan entry
///
/// `bash` gets a command (explicit field, else mined from the description);
/// file tools get a path (explicit, else mined) and content (explicit, else
/// null meaning "generate at execution time"). Unrecognized tools carry the
/// entry's extra fields verbatim.
fn build_arguments(tool: &str, entry: &PlanEntry) -> Option<Value> {
    let mut args: Map<String, Value> = entry.extra.clone();

    match tool {
        "bash" => {
            let command = entry.command.clone().or_else(|| extract::extract_command(&entry.description));
            if let Some(command) = command {
                args.insert("command".to_string(), Value::String(command));
            }
        }
        "write_file" | "file" => {
            if let Some(path) = entry.file_path.clone().or_else(|| extract::extract_file_path(&entry.description)) {
                args.insert("file_path".to_string(), Value::String(path));
            }
            args.insert(
                "content".to_string(),
                entry.content.clone().map(Value::String).unwrap_or(Value::Null),
            );
        }
        _ => {
            if let Some(path) = &entry.file_path {
                args.insert("file_path".to_string(), Value::String(path.clone()));
            }
            if let Some(command) = &entry.command {
                args.insert("command".to_string(), Value::String(command.clone()));
            }
        }
    }

    if args.is_empty() { None } else { Some(Value::Object(args)) }
}

/// Classify prompt complexity
///
/// Simple: at most 15 words and no tool keywords. Complex: multi-step
/// markers, or tool keywords on a long prompt. Moderate: everything in
/// between. A hint for logging and pacing, never a behavior gate.
pub fn classify_complexity(prompt: &str) -> PlanComplexity {
    let words = extract::word_count(prompt);
    let tool_keywords = extract::has_tool_keywords(prompt);

    if extract::has_multi_step_markers(prompt) || (tool_keywords && words > 20) {
        PlanComplexity::Complex
    } else if tool_keywords || words > 15 {
        PlanComplexity::Moderate
    } else {
        PlanComplexity::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::llm::mock::MockLlmClient;

    fn planner_with(responses: Vec<&str>) -> (Planner, Arc<MockLlmClient>) {
        let llm = Arc::new(MockLlmClient::new(responses));
        let bus = EventBus::new(256);
        let planner = Planner::new(llm.clone(), Arc::new(ToolRegistry::new()), None, bus.emitter_for("test-run"));
        (planner, llm)
    }

    #[tokio::test]
    async fn test_conversation_plan() {
        let (planner, llm) = planner_with(vec![r#"{"type":"conversation","response":"4"}"#]);
        let plan = planner.create_plan("What is 2 + 2?").await.unwrap();

        assert!(plan.is_conversation());
        assert_eq!(plan.conversation_response.as_deref(), Some("4"));
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.complexity, PlanComplexity::Simple);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_task_plan_with_explicit_arguments() {
        let (planner, _) = planner_with(vec![
            r#"{"type":"tasks","plan":[{"description":"Create notes.txt with greeting","tool":"write_file","file_path":"notes.txt","content":"hello world"}]}"#,
        ]);
        let plan = planner
            .create_plan("Create a file called notes.txt with content 'hello world'")
            .await
            .unwrap();

        assert_eq!(plan.tasks.len(), 1);
        let task = &plan.tasks[0];
        assert_eq!(task.tools, vec!["write_file"]);
        assert_eq!(task.task_type, TaskType::Tool);
        let args = task.arguments_for("write_file").unwrap();
        assert_eq!(args["file_path"], "notes.txt");
        assert_eq!(args["content"], "hello world");
        assert!(plan.parallelizable);
    }

    #[tokio::test]
    async fn test_missing_content_becomes_null() {
        let (planner, _) = planner_with(vec![
            r#"{"type":"tasks","plan":[{"description":"Create report.md","tool":"write_file","file_path":"report.md"}]}"#,
        ]);
        let plan = planner.create_plan("Create report.md").await.unwrap();
        let args = plan.tasks[0].arguments_for("write_file").unwrap();
        // null signals "generate content at execution time"
        assert!(args["content"].is_null());
    }

    #[tokio::test]
    async fn test_tool_inferred_from_description() {
        let (planner, _) = planner_with(vec![
            r#"{"type":"tasks","plan":[{"description":"Run the test suite with cargo test"}]}"#,
        ]);
        let plan = planner.create_plan("Run the tests").await.unwrap();
        assert_eq!(plan.tasks[0].tools, vec!["bash"]);
        let args = plan.tasks[0].arguments_for("bash").unwrap();
        assert!(args["command"].is_string());
    }

    #[tokio::test]
    async fn test_ids_assigned_and_preserved() {
        let (planner, _) = planner_with(vec![
            r#"{"type":"tasks","plan":[
                {"id":"my-id","description":"Create a.txt","tool":"write_file","file_path":"a.txt"},
                {"description":"Create b.txt","tool":"write_file","file_path":"b.txt"}
            ]}"#,
        ]);
        let plan = planner.create_plan("Create a.txt and b.txt").await.unwrap();
        assert_eq!(plan.tasks[0].id, "my-id");
        assert!(plan.tasks[1].id.starts_with("task_"));
        assert_eq!(plan.tasks[0].priority, 1);
        assert_eq!(plan.tasks[1].priority, 2);
    }

    #[tokio::test]
    async fn test_anaphoric_dependency_inferred() {
        let (planner, _) = planner_with(vec![
            r##"{"type":"tasks","plan":[
                {"description":"Create report.md with a header","tool":"write_file","file_path":"report.md","content":"# Report"},
                {"description":"Read it back","tool":"read_file"}
            ]}"##,
        ]);
        let plan = planner.create_plan("Create report.md with a header, then read it back").await.unwrap();

        assert_eq!(plan.tasks[1].dependencies, vec![plan.tasks[0].id.clone()]);
        assert!(!plan.parallelizable);
        assert_eq!(plan.complexity, PlanComplexity::Complex);
    }

    #[tokio::test]
    async fn test_independent_tasks_parallelizable() {
        let (planner, _) = planner_with(vec![
            r#"{"type":"tasks","plan":[
                {"description":"Create a.txt with A","tool":"write_file","file_path":"a.txt","content":"A"},
                {"description":"Create b.txt with B","tool":"write_file","file_path":"b.txt","content":"B"}
            ]}"#,
        ]);
        let plan = planner.create_plan("Create a.txt with 'A' and create b.txt with 'B'").await.unwrap();
        assert!(plan.parallelizable);
    }

    #[tokio::test]
    async fn test_invalid_json_retries_once_then_recovers() {
        let (planner, llm) = planner_with(vec![
            "Sure! I'll create that file for you right away.",
            r#"{"type":"tasks","plan":[{"description":"Create notes.txt","tool":"write_file","file_path":"notes.txt","content":"hi"}]}"#,
        ]);
        let plan = planner.create_plan("Create notes.txt").await.unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(llm.call_count(), 2);

        // The retry prompt restates the shape and forbids prose
        let retry_request = &llm.requests()[1];
        assert!(retry_request.messages[0].content.contains("ONLY a JSON object"));
    }

    #[tokio::test]
    async fn test_invalid_json_twice_is_fatal() {
        let (planner, llm) = planner_with(vec!["prose", "more prose"]);
        let err = planner.create_plan("Create notes.txt").await.unwrap_err();
        assert_eq!(err.kind(), "plan-invalid-json");
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let (planner, llm) = planner_with(vec![]);
        let err = planner.create_plan("   ").await.unwrap_err();
        assert_eq!(err.kind(), "invalid-input");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_task_list_is_shape_error() {
        let (planner, _) = planner_with(vec![r#"{"type":"tasks","plan":[]}"#]);
        let err = planner.create_plan("do something").await.unwrap_err();
        assert_eq!(err.kind(), "plan-shape-invalid");
    }

    #[tokio::test]
    async fn test_framing_prepended() {
        let (planner, llm) = planner_with(vec![r#"{"type":"conversation","response":"The answer."}"#]);
        planner
            .create_plan_framed("what does the log say?", Some(SIMPLE_QUESTION_FRAMING))
            .await
            .unwrap();
        assert!(llm.requests()[0].messages[0].content.starts_with("SIMPLE QUESTION:"));
    }

    #[tokio::test]
    async fn test_round_trip_normalization_stable() {
        let (planner, _) = planner_with(vec![
            r##"{"type":"tasks","plan":[
                {"description":"Create report.md","tool":"write_file","file_path":"report.md","content":"# R"},
                {"description":"Read it back","tool":"read_file"}
            ]}"##,
        ]);
        let plan = planner.create_plan("Create report.md, then read it back").await.unwrap();

        let json = serde_json::to_string(&plan).unwrap();
        let reparsed: TaskPlan = serde_json::from_str(&json).unwrap();

        assert_eq!(reparsed.tasks.len(), plan.tasks.len());
        for (a, b) in plan.tasks.iter().zip(reparsed.tasks.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.description, b.description);
            assert_eq!(a.tools, b.tools);
            assert_eq!(a.arguments, b.arguments);
            assert_eq!(a.dependencies, b.dependencies);
        }
    }

    #[test]
    fn test_classify_complexity() {
        assert_eq!(classify_complexity("What is the capital of France?"), PlanComplexity::Simple);
        assert_eq!(classify_complexity("Create a file called notes.txt"), PlanComplexity::Moderate);
        assert_eq!(
            classify_complexity("Create report.md with a header, then read it back"),
            PlanComplexity::Complex
        );
        assert_eq!(
            classify_complexity(
                "Create a new configuration file for the web server and make sure every default \
                 value matches what the deployment guide recommends for production machines"
            ),
            PlanComplexity::Complex
        );
    }
}
