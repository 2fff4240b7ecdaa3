//! Executor - drives a TaskPlan against an ExecutionContext
//!
//! Per-task state machine (pending → running → succeeded/failed/aborted),
//! argument resolution, approval review, bounded deterministic recovery,
//! and two plan modes: sequential (strict happens-before, stop on first
//! failure) and parallel (one concurrent unit per task, fail-soft,
//! order-preserving results).

mod arguments;
mod recovery;

pub use arguments::generate_file_content;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::approval::ApprovalGate;
use crate::config::ExecutorConfig;
use crate::context::{ExecutionContext, ToolExecutionRecord};
use crate::domain::{ExecutionResult, Task, TaskPlan};
use crate::events::EventEmitter;
use crate::extract;
use crate::llm::LlmClient;
use crate::tools::{ToolOutcome, ToolRegistry};

/// Side effects gathered while a task runs, applied to the context under a
/// single critical section
#[derive(Debug, Default)]
struct SideEffects {
    created_files: Vec<String>,
    modified_files: Vec<String>,
    commands: Vec<String>,
    web_searches: Vec<String>,
    tool_records: Vec<ToolExecutionRecord>,
}

/// Executes plans task by task
pub struct Executor {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    approval: Arc<ApprovalGate>,
    config: ExecutorConfig,
    events: EventEmitter,
    /// One cancellation token per running task
    active: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl Executor {
    /// Create an executor over the shared components
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        approval: Arc<ApprovalGate>,
        config: ExecutorConfig,
        events: EventEmitter,
    ) -> Self {
        Self {
            llm,
            registry,
            approval,
            config,
            events,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Cancel one running task
    pub async fn abort_task(&self, task_id: &str) {
        if let Some(token) = self.active.lock().await.get(task_id) {
            info!(task_id, "abort_task: signalling cancellation");
            let _ = token.send(true);
        }
    }

    /// Cancel every running task. All tokens are signalled before this
    /// returns.
    pub async fn abort_all(&self) {
        let active = self.active.lock().await;
        info!(count = active.len(), "abort_all: signalling cancellation");
        for token in active.values() {
            let _ = token.send(true);
        }
    }

    /// Execute a plan, returning one result per task in plan order
    pub async fn execute_plan(&self, plan: &TaskPlan, ctx: &mut ExecutionContext) -> Vec<ExecutionResult> {
        self.events.plan_started(plan.tasks.len(), plan.parallelizable);

        let results = if plan.parallelizable {
            self.execute_parallel(plan, ctx).await
        } else {
            self.execute_sequential(plan, ctx).await
        };

        let succeeded = results.iter().filter(|r| r.success).count();
        self.events.plan_completed(succeeded, results.len() - succeeded);
        results
    }

    /// Execute one task against the context
    pub async fn execute_task(&self, task: &Task, ctx: &mut ExecutionContext) -> ExecutionResult {
        let (result, effects) = self.run_task(task, ctx).await;
        apply_effects(ctx, task, &result, effects);
        result
    }

    /// Sequential mode: strict order, stop on first failure, completed
    /// results preserved
    async fn execute_sequential(&self, plan: &TaskPlan, ctx: &mut ExecutionContext) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(plan.tasks.len());

        for task in &plan.tasks {
            if let Err(message) = self.wait_for_dependencies(task, ctx).await {
                // The task never started, so only the plan-level error fires
                self.events.plan_error(&task.id, &message);
                let result = ExecutionResult::failure(&task.id, message, Vec::new(), 0);
                apply_effects(ctx, task, &result, SideEffects::default());
                results.push(result);
                break;
            }

            let result = self.execute_task(task, ctx).await;
            let failed = !result.success;
            if failed {
                self.events.plan_error(&task.id, result.error.as_deref().unwrap_or("failed"));
            }
            results.push(result);
            if failed {
                break;
            }
        }

        results
    }

    /// Parallel mode: one concurrent unit per task, no cross-task waiting,
    /// failures stay task-local, result order matches plan order
    async fn execute_parallel(&self, plan: &TaskPlan, ctx: &mut ExecutionContext) -> Vec<ExecutionResult> {
        let snapshot = ctx.clone();
        let working_dir = ctx.working_dir.clone();
        let shared = Arc::new(Mutex::new(std::mem::replace(ctx, ExecutionContext::new(working_dir))));

        let futures = plan.tasks.iter().map(|task| {
            let snapshot = &snapshot;
            let shared = Arc::clone(&shared);
            async move {
                let (result, effects) = self.run_task(task, snapshot).await;
                // Single critical section around context mutation
                let mut guard = shared.lock().await;
                apply_effects(&mut guard, task, &result, effects);
                result
            }
        });

        let results = join_all(futures).await;

        *ctx = match Arc::try_unwrap(shared) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        results
    }

    /// Wait until every dependency has a successful result
    ///
    /// Polls at the configured interval, bounded by the tool timeout.
    /// A failed dependency resolves immediately to an error.
    async fn wait_for_dependencies(&self, task: &Task, ctx: &ExecutionContext) -> Result<(), String> {
        if task.dependencies.is_empty() {
            return Ok(());
        }

        let poll = Duration::from_millis(self.config.dependency_poll_ms);
        let deadline = Instant::now() + Duration::from_millis(self.config.tool_timeout_ms);

        loop {
            let mut missing = None;
            for dep in &task.dependencies {
                match ctx.result_for(dep) {
                    Some(result) if result.success => {}
                    Some(_) => return Err(format!("dependency '{}' failed", dep)),
                    None => {
                        missing = Some(dep.clone());
                        break;
                    }
                }
            }

            match missing {
                None => return Ok(()),
                Some(dep) if Instant::now() >= deadline => {
                    return Err(format!("timeout waiting for dependency '{}'", dep));
                }
                Some(_) => tokio::time::sleep(poll).await,
            }
        }
    }

    /// Run one task through its state machine, collecting side effects
    async fn run_task(&self, task: &Task, ctx: &ExecutionContext) -> (ExecutionResult, SideEffects) {
        let started = Instant::now();
        self.events.task_started(&task.id, &task.description);
        self.events.status(format!("running: {}", task.description));

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.active.lock().await.insert(task.id.clone(), cancel_tx);

        let outcome = self.run_tools(task, ctx, cancel_rx).await;

        self.active.lock().await.remove(&task.id);
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            TaskOutcome::Success { output, tools_used, effects } => {
                self.events.task_completed(&task.id, duration_ms);
                (ExecutionResult::success(&task.id, output, tools_used, duration_ms), effects)
            }
            TaskOutcome::Failure { error, tools_used, effects } => {
                self.events.task_error(&task.id, &error);
                (ExecutionResult::failure(&task.id, error, tools_used, duration_ms), effects)
            }
            TaskOutcome::Aborted { effects } => {
                self.events.task_aborted(&task.id);
                (ExecutionResult::aborted(&task.id, duration_ms), effects)
            }
        }
    }

    /// Invoke each bound tool in order
    async fn run_tools(&self, task: &Task, ctx: &ExecutionContext, mut cancel_rx: watch::Receiver<bool>) -> TaskOutcome {
        let mut effects = SideEffects::default();
        let mut tools_used = Vec::new();
        let mut outputs = Vec::new();

        if task.tools.is_empty() {
            // Simple task: the description is the work
            return TaskOutcome::Success {
                output: task.description.clone(),
                tools_used,
                effects,
            };
        }

        for tool_name in &task.tools {
            if *cancel_rx.borrow() {
                return TaskOutcome::Aborted { effects };
            }

            let Some(tool) = self.registry.get(tool_name) else {
                return TaskOutcome::Failure {
                    error: format!("tool not found: {}", tool_name),
                    tools_used,
                    effects,
                };
            };

            let args = arguments::resolve(task, tool_name, ctx, self.llm.as_ref(), &self.config, &self.events).await;

            if let Err(e) = self.approval.review(tool.as_ref(), &args).await {
                return TaskOutcome::Failure {
                    error: e.to_string(),
                    tools_used,
                    effects,
                };
            }

            self.events.tool_execute(&task.id, tool_name, &args);
            self.events.status(display_name(tool_name, &args));

            let invocation = async {
                let outcome = self.registry.execute(tool_name, &args).await;
                self.events
                    .tool_result(&task.id, tool_name, outcome.success, outcome.output.as_deref().unwrap_or_default());

                if outcome.success {
                    outcome
                } else {
                    self.events.tool_failure(&task.id, tool_name, outcome.error_message());
                    match recovery::attempt(tool_name, &args, outcome.error_message(), &self.registry, &self.events).await {
                        Some(recovered) => {
                            debug!(tool = %tool_name, success = recovered.success, "run_tools: recovery attempted");
                            recovered
                        }
                        None => outcome,
                    }
                }
            };

            let outcome: ToolOutcome = tokio::select! {
                outcome = invocation => outcome,
                _ = cancel_rx.changed() => {
                    warn!(task = %task.id, "run_tools: cancelled mid-invocation");
                    return TaskOutcome::Aborted { effects };
                }
            };

            tools_used.push(tool_name.clone());
            effects.tool_records.push(ToolExecutionRecord {
                tool: tool_name.clone(),
                args: args.clone(),
                success: outcome.success,
            });

            if !outcome.success {
                return TaskOutcome::Failure {
                    error: outcome.error.unwrap_or_else(|| "tool failed".to_string()),
                    tools_used,
                    effects,
                };
            }

            let output = outcome.output.unwrap_or_default();
            track_side_effects(tool_name, &args, &output, &task.description, &mut effects);
            outputs.push(output);
        }

        TaskOutcome::Success {
            output: outputs.join("\n"),
            tools_used,
            effects,
        }
    }
}

/// Terminal outcome of one task run
enum TaskOutcome {
    Success {
        output: String,
        tools_used: Vec<String>,
        effects: SideEffects,
    },
    Failure {
        error: String,
        tools_used: Vec<String>,
        effects: SideEffects,
    },
    Aborted {
        effects: SideEffects,
    },
}

/// Apply collected effects and the result to the context
fn apply_effects(ctx: &mut ExecutionContext, task: &Task, result: &ExecutionResult, effects: SideEffects) {
    for path in effects.created_files {
        ctx.note_created_file(path);
    }
    for path in effects.modified_files {
        ctx.note_modified_file(path);
    }
    for command in effects.commands {
        ctx.note_command(command);
    }
    for query in effects.web_searches {
        ctx.note_web_search(query);
    }
    for record in effects.tool_records {
        ctx.record_tool_execution(&task.id, record);
    }
    ctx.record_result(&task.description, result.clone());
}

/// Inspect a successful invocation for trackable side effects
fn track_side_effects(tool_name: &str, args: &Value, output: &str, description: &str, effects: &mut SideEffects) {
    match tool_name {
        "bash" => {
            if let Some(command) = args.get("command").and_then(Value::as_str) {
                effects.commands.push(command.to_string());
            }
        }
        "web" | "search" => {
            if let Some(query) = args.get("query").and_then(Value::as_str) {
                effects.web_searches.push(query.to_string());
            }
        }
        "edit" | "smart_edit" => {
            if let Some(path) = args.get("file_path").or_else(|| args.get("path")).and_then(Value::as_str) {
                effects.modified_files.push(path.to_string());
            }
        }
        _ => {}
    }

    // "File written: <p>" / "Created: <p>" in the output, else an
    // extension-bearing token in the description for write tools
    if let Some(path) = scan_created_path(output) {
        effects.created_files.push(path);
    } else if arguments::is_write_tool(tool_name) {
        if let Some(path) = args.get("file_path").or_else(|| args.get("path")).and_then(Value::as_str) {
            effects.created_files.push(path.to_string());
        } else if let Some(path) = extract::extract_file_path(description) {
            effects.created_files.push(path);
        }
    }
}

/// Scan a tool output line for a created-file announcement
fn scan_created_path(output: &str) -> Option<String> {
    for prefix in ["File written: ", "Created: "] {
        if let Some(idx) = output.find(prefix) {
            let rest = &output[idx + prefix.len()..];
            let path = rest.split_whitespace().next()?;
            return Some(path.trim_end_matches(['.', ',']).to_string());
        }
    }
    None
}

/// Short display summary for status events
fn display_name(tool_name: &str, args: &Value) -> String {
    let arg = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| args.get(*k).and_then(Value::as_str))
            .unwrap_or("?")
            .to_string()
    };

    match tool_name {
        "write_file" | "file" => format!("Write({})", arg(&["file_path", "path"])),
        "read_file" | "read" => format!("Read({})", arg(&["file_path", "path"])),
        "edit" | "smart_edit" => format!("Edit({})", arg(&["file_path", "path"])),
        "bash" => {
            let command = arg(&["command"]);
            let short: String = command.chars().take(40).collect();
            if short.len() < command.len() {
                format!("Bash({}…)", short)
            } else {
                format!("Bash({})", short)
            }
        }
        "web" | "search" => format!("WebSearch(\"{}\")", arg(&["query"])),
        "grep" | "rg" => format!("Search({})", arg(&["pattern"])),
        "git" => format!("Git({})", arg(&["operation"])),
        other => format!("{}(…)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{AllowAll, ApprovalMode};
    use crate::domain::{PlanComplexity, TaskPlan};
    use crate::events::{AgentEvent, EventBus};
    use crate::llm::mock::MockLlmClient;
    use crate::tools::{ParamKind, Tool, ToolParameter, ToolSchema};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory file store standing in for a real file tool
    struct FakeFs {
        files: std::sync::Mutex<HashMap<String, String>>,
    }

    impl FakeFs {
        fn shared() -> Arc<Self> {
            Arc::new(Self {
                files: std::sync::Mutex::new(HashMap::new()),
            })
        }
    }

    struct FakeWrite(Arc<FakeFs>);

    #[async_trait]
    impl Tool for FakeWrite {
        fn name(&self) -> &str {
            "write_file"
        }

        fn description(&self) -> &str {
            "Write content to a file"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(
                "write_file",
                "Write content to a file",
                vec![
                    ToolParameter::required("file_path", ParamKind::String, "Path"),
                    ToolParameter::optional("content", ParamKind::String, "Content"),
                ],
            )
        }

        async fn execute(&self, args: &Value) -> ToolOutcome {
            let path = args["file_path"].as_str().unwrap().to_string();
            let content = args["content"].as_str().unwrap_or_default().to_string();
            self.0.files.lock().unwrap().insert(path.clone(), content);
            ToolOutcome::ok(format!("File written: {}", path))
        }
    }

    struct FakeRead(Arc<FakeFs>);

    #[async_trait]
    impl Tool for FakeRead {
        fn name(&self) -> &str {
            "read_file"
        }

        fn description(&self) -> &str {
            "Read a file"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(
                "read_file",
                "Read a file",
                vec![ToolParameter::required("file_path", ParamKind::String, "Path")],
            )
        }

        async fn execute(&self, args: &Value) -> ToolOutcome {
            let path = args["file_path"].as_str().unwrap();
            match self.0.files.lock().unwrap().get(path) {
                Some(content) => ToolOutcome::ok(content.clone()),
                None => ToolOutcome::err(format!("not found: {}", path)),
            }
        }
    }

    struct FailingEdit;

    #[async_trait]
    impl Tool for FailingEdit {
        fn name(&self) -> &str {
            "edit"
        }

        fn description(&self) -> &str {
            "Edit a file"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new("edit", "Edit a file", vec![])
        }

        async fn execute(&self, _args: &Value) -> ToolOutcome {
            ToolOutcome::err("permission-denied")
        }
    }

    struct SlowWrite {
        started: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for SlowWrite {
        fn name(&self) -> &str {
            "write_file"
        }

        fn description(&self) -> &str {
            "Slow write"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new("write_file", "Slow write", vec![])
        }

        async fn execute(&self, _args: &Value) -> ToolOutcome {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(10)).await;
            ToolOutcome::ok("File written: slow.txt")
        }
    }

    fn executor_with(registry: ToolRegistry, bus: &EventBus) -> Executor {
        Executor::new(
            Arc::new(MockLlmClient::new(vec![])),
            Arc::new(registry),
            Arc::new(ApprovalGate::new(ApprovalMode::Default, Arc::new(AllowAll))),
            ExecutorConfig::default(),
            bus.emitter_for("test-run"),
        )
    }

    fn write_task(id: &str, path: &str, content: &str, priority: u32) -> Task {
        Task::with_tool(id, format!("Create {}", path), "write_file", priority)
            .with_arguments("write_file", serde_json::json!({"file_path": path, "content": content}))
    }

    #[tokio::test]
    async fn test_single_write_task() {
        let fs = FakeFs::shared();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FakeWrite(fs.clone()))).unwrap();
        let bus = EventBus::new(256);
        let executor = executor_with(registry, &bus);

        let plan = TaskPlan::tasks(
            "plan-1",
            "Create notes.txt",
            vec![write_task("t1", "notes.txt", "hello world", 1)],
            PlanComplexity::Moderate,
        );
        let mut ctx = ExecutionContext::new("/tmp");
        let results = executor.execute_plan(&plan, &mut ctx).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(results[0].tools_used, vec!["write_file"]);
        assert_eq!(ctx.created_files, vec!["notes.txt"]);
        assert_eq!(fs.files.lock().unwrap()["notes.txt"], "hello world");
        assert_eq!(ctx.task_history.len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_dependency_reads_earlier_write() {
        let fs = FakeFs::shared();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FakeWrite(fs.clone()))).unwrap();
        registry.register(Arc::new(FakeRead(fs.clone()))).unwrap();
        let bus = EventBus::new(256);
        let executor = executor_with(registry, &bus);

        let t1 = write_task("t1", "report.md", "# Report", 1);
        let t2 = Task::with_tool("t2", "Read it back", "read_file", 2).depends_on("t1");
        let plan = TaskPlan::tasks("plan-1", "Create report.md, then read it back", vec![t1, t2], PlanComplexity::Complex);

        let mut ctx = ExecutionContext::new("/tmp");
        let results = executor.execute_plan(&plan, &mut ctx).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].success && results[1].success);
        // The read saw exactly what the write wrote
        assert_eq!(results[1].output.as_deref(), Some("# Report"));
    }

    #[tokio::test]
    async fn test_sequential_stops_on_first_failure() {
        let fs = FakeFs::shared();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingEdit)).unwrap();
        registry.register(Arc::new(FakeWrite(fs.clone()))).unwrap();
        let bus = EventBus::new(256);
        let mut rx = bus.subscribe();
        let executor = executor_with(registry, &bus);

        let t1 = Task::with_tool("t1", "Edit the config", "edit", 1);
        let t2 = write_task("t2", "after.txt", "x", 2).depends_on("t1");
        let plan = TaskPlan::tasks("plan-1", "edit then write", vec![t1, t2], PlanComplexity::Complex);

        let mut ctx = ExecutionContext::new("/tmp");
        let results = executor.execute_plan(&plan, &mut ctx).await;

        // First failure stops the plan; the second task never starts
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("permission-denied"));
        assert!(fs.files.lock().unwrap().is_empty());

        let mut saw_plan_error = false;
        while let Ok(envelope) = rx.try_recv() {
            if matches!(envelope.event, AgentEvent::PlanError { .. }) {
                saw_plan_error = true;
            }
        }
        assert!(saw_plan_error);
    }

    #[tokio::test]
    async fn test_parallel_preserves_plan_order() {
        let fs = FakeFs::shared();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FakeWrite(fs.clone()))).unwrap();
        let bus = EventBus::new(256);
        let executor = executor_with(registry, &bus);

        let tasks: Vec<Task> = (0..8)
            .map(|i| write_task(&format!("t{}", i), &format!("f{}.txt", i), "x", i as u32 + 1))
            .collect();
        let plan = TaskPlan::tasks("plan-1", "create many files", tasks, PlanComplexity::Moderate);
        assert!(plan.parallelizable);

        let mut ctx = ExecutionContext::new("/tmp");
        let results = executor.execute_plan(&plan, &mut ctx).await;

        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.task_id, format!("t{}", i));
            assert!(result.success);
        }
        assert_eq!(fs.files.lock().unwrap().len(), 8);
        assert_eq!(ctx.task_history.len(), 8);
    }

    #[tokio::test]
    async fn test_parallel_failure_is_task_local() {
        let fs = FakeFs::shared();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FakeWrite(fs.clone()))).unwrap();
        registry.register(Arc::new(FailingEdit)).unwrap();
        let bus = EventBus::new(256);
        let executor = executor_with(registry, &bus);

        let t1 = Task::with_tool("t1", "Edit the config", "edit", 1);
        let t2 = write_task("t2", "b.txt", "B", 2);
        let plan = TaskPlan::tasks("plan-1", "both", vec![t1, t2], PlanComplexity::Moderate);
        assert!(plan.parallelizable);

        let mut ctx = ExecutionContext::new("/tmp");
        let results = executor.execute_plan(&plan, &mut ctx).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        // The sibling ran to completion despite the failure
        assert!(results[1].success);
        assert_eq!(ctx.created_files, vec!["b.txt"]);
    }

    #[tokio::test]
    async fn test_missing_tool_fails_task() {
        let bus = EventBus::new(256);
        let executor = executor_with(ToolRegistry::new(), &bus);

        let task = Task::with_tool("t1", "Search the web", "web", 1);
        let mut ctx = ExecutionContext::new("/tmp");
        let result = executor.execute_task(&task, &mut ctx).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("tool not found"));
    }

    #[tokio::test]
    async fn test_simple_task_succeeds_without_tools() {
        let bus = EventBus::new(256);
        let executor = executor_with(ToolRegistry::new(), &bus);

        let task = Task::simple("t1", "Consider the request", 1);
        let mut ctx = ExecutionContext::new("/tmp");
        let result = executor.execute_task(&task, &mut ctx).await;

        assert!(result.success);
        assert!(result.tools_used.is_empty());
    }

    #[tokio::test]
    async fn test_abort_all_cancels_running_task() {
        let started = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::with_timeout(Duration::from_secs(60));
        registry
            .register(Arc::new(SlowWrite {
                started: started.clone(),
            }))
            .unwrap();
        let bus = EventBus::new(256);
        let mut rx = bus.subscribe();
        let executor = Arc::new(executor_with(registry, &bus));

        let task = Task::with_tool("t1", "Create slow.txt", "write_file", 1)
            .with_arguments("write_file", serde_json::json!({"file_path": "slow.txt", "content": "x"}));
        let plan = TaskPlan::tasks("plan-1", "slow", vec![task], PlanComplexity::Simple);

        let runner = {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move {
                let mut ctx = ExecutionContext::new("/tmp");
                executor.execute_plan(&plan, &mut ctx).await
            })
        };

        // Wait until the tool is actually running, then abort
        while started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        executor.abort_all().await;

        let results = tokio::time::timeout(Duration::from_millis(200), runner).await.expect("abort must land within 200ms").unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("aborted"));

        let mut saw_aborted = false;
        while let Ok(envelope) = rx.try_recv() {
            if matches!(envelope.event, AgentEvent::TaskAborted { .. }) {
                saw_aborted = true;
            }
        }
        assert!(saw_aborted);
    }

    #[tokio::test]
    async fn test_task_start_events_balance_terminal_events() {
        let fs = FakeFs::shared();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FakeWrite(fs.clone()))).unwrap();
        registry.register(Arc::new(FailingEdit)).unwrap();
        let bus = EventBus::new(512);
        let mut rx = bus.subscribe();
        let executor = executor_with(registry, &bus);

        let t1 = write_task("t1", "a.txt", "A", 1);
        let t2 = Task::with_tool("t2", "Edit something", "edit", 2);
        let plan = TaskPlan::tasks("plan-1", "write and edit", vec![t1, t2], PlanComplexity::Moderate);

        let mut ctx = ExecutionContext::new("/tmp");
        executor.execute_plan(&plan, &mut ctx).await;

        let (mut starts, mut terminals) = (0, 0);
        while let Ok(envelope) = rx.try_recv() {
            match envelope.event {
                AgentEvent::TaskStarted { .. } => starts += 1,
                AgentEvent::TaskCompleted { .. } | AgentEvent::TaskError { .. } | AgentEvent::TaskAborted { .. } => {
                    terminals += 1
                }
                _ => {}
            }
        }
        assert_eq!(starts, 2);
        assert_eq!(starts, terminals);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            display_name("write_file", &serde_json::json!({"file_path": "a.txt"})),
            "Write(a.txt)"
        );
        assert_eq!(display_name("bash", &serde_json::json!({"command": "ls"})), "Bash(ls)");
        let long = "x".repeat(80);
        assert!(display_name("bash", &serde_json::json!({"command": long})).ends_with("…)"));
        assert_eq!(
            display_name("web", &serde_json::json!({"query": "btc price"})),
            "WebSearch(\"btc price\")"
        );
        assert_eq!(display_name("glob", &serde_json::json!({})), "glob(…)");
    }

    #[test]
    fn test_scan_created_path() {
        assert_eq!(scan_created_path("File written: notes.txt").as_deref(), Some("notes.txt"));
        assert_eq!(scan_created_path("Created: out/report.md, 120 bytes").as_deref(), Some("out/report.md"));
        assert!(scan_created_path("42 bytes flushed").is_none());
    }
}
