//! Argument resolution - from planner-supplied records and description
//! mining to a record the tool will accept
//!
//! Precedence per tool: the planner's explicit arguments win, then
//! description mining, then a documented per-tool fallback. Missing file
//! content is generated with a single deterministic LLM call; generation
//! failure degrades to a TODO sentinel, never to task failure.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::context::ExecutionContext;
use crate::domain::Task;
use crate::events::EventEmitter;
use crate::extract;
use crate::llm::{ChatRequest, LlmClient};

/// Fallback path when nothing in the description looks like one
const FALLBACK_FILE_PATH: &str = "file.txt";

/// Tools treated as file writers
pub fn is_write_tool(tool: &str) -> bool {
    matches!(tool, "write_file" | "file")
}

/// Tools treated as file readers
pub fn is_read_tool(tool: &str) -> bool {
    matches!(tool, "read_file" | "read")
}

/// Resolve the argument record for one tool invocation
pub async fn resolve(
    task: &Task,
    tool_name: &str,
    ctx: &ExecutionContext,
    llm: &dyn LlmClient,
    config: &ExecutorConfig,
    events: &EventEmitter,
) -> Value {
    // 1. Start from the planner's record when there is one
    let mut args: Map<String, Value> = match task.arguments_for(tool_name) {
        Some(Value::Object(map)) => map.clone(),
        _ => fallback_parse(tool_name, &task.description),
    };

    match tool_name {
        "bash" => {
            // 2. Mine the command phrase when the planner left it out
            if is_absent(args.get("command")) {
                let command = extract::extract_command(&task.description)
                    .unwrap_or_else(|| task.description.trim().to_string());
                args.insert("command".to_string(), Value::String(command));
            }
        }
        name if is_write_tool(name) => {
            // 3. Generate content when the planner deferred it
            if is_absent(args.get("content")) {
                let content = generate_file_content(llm, &task.description, config, events).await;
                args.insert("content".to_string(), Value::String(content));
            }
            // 4. Path extraction precedence, ending in the documented fallback
            if is_absent(args.get("file_path")) && is_absent(args.get("path")) {
                let path = extract::extract_file_path(&task.description)
                    .unwrap_or_else(|| FALLBACK_FILE_PATH.to_string());
                args.insert("file_path".to_string(), Value::String(path));
            }
        }
        name if is_read_tool(name) => {
            // 5. Anaphoric reads target the most recently created file
            if is_absent(args.get("file_path")) && is_absent(args.get("path")) {
                let path = if extract::has_anaphoric_reference(&task.description) {
                    ctx.last_created_file().map(String::from)
                } else {
                    None
                }
                .or_else(|| extract::extract_file_path(&task.description));

                if let Some(path) = path {
                    args.insert("file_path".to_string(), Value::String(path));
                }
            }
        }
        _ => {}
    }

    debug!(task = %task.id, tool = tool_name, "resolve: arguments ready");
    Value::Object(args)
}

/// Per-tool parser used when the planner supplied no arguments at all.
/// Every parser bottoms out in a safe default rather than failing.
fn fallback_parse(tool_name: &str, description: &str) -> Map<String, Value> {
    let mut args = Map::new();
    match tool_name {
        "grep" | "rg" => {
            // quoted string → first substantial word → match-everything
            args.insert("pattern".to_string(), Value::String(extract::extract_search_pattern(description)));
        }
        "web" | "search" => {
            args.insert("query".to_string(), Value::String(extract::extract_web_query(description)));
        }
        "edit" | "smart_edit" => {
            if let Some(path) = extract::extract_file_path(description) {
                args.insert("file_path".to_string(), Value::String(path));
            }
        }
        "git" => {
            if let Some(op) = extract::extract_quoted(description) {
                args.insert("operation".to_string(), Value::String(op));
            }
        }
        _ => {}
    }
    args
}

/// Generate file content with one deterministic LLM call
///
/// Returns the raw content, or a TODO sentinel on any failure - generation
/// failure is not task failure.
pub async fn generate_file_content(
    llm: &dyn LlmClient,
    description: &str,
    config: &ExecutorConfig,
    events: &EventEmitter,
) -> String {
    let prompt = format!(
        "Write the full contents of the file described below.\n\
         Return ONLY the raw file content - no explanations, no markdown fences, no commentary.\n\n\
         File description: {}",
        description
    );

    let request = ChatRequest::user(prompt)
        .with_temperature(0.0)
        .with_max_tokens(config.content_max_tokens);

    match llm.chat(request).await {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "generate_file_content: generation failed, writing sentinel");
            events.status("content generation failed, writing TODO sentinel");
            format!("// TODO: generate content for: {}", description)
        }
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}
