//! Recovery - bounded, deterministic remediation of failed tool calls
//!
//! A fixed rule set, applied at most once per failure, with no LLM calls on
//! this path:
//! - file-not-found while writing → create the parent directory, retry
//! - permission-denied on an absolute shell command → rewrite under /tmp, retry
//! - timeout/network on a web tool → wait 2s, retry
//!
//! Anything else returns `None` and the original error stands.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::arguments::is_write_tool;
use crate::events::EventEmitter;
use crate::tools::{ToolOutcome, ToolRegistry};

/// Pause before retrying a flaky network fetch
const NETWORK_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Try to recover from a failed tool invocation
///
/// Returns `Some(outcome)` of the single retry when a rule applies, `None`
/// when the failure is not recoverable in-band.
pub async fn attempt(
    tool_name: &str,
    args: &Value,
    error: &str,
    registry: &ToolRegistry,
    events: &EventEmitter,
) -> Option<ToolOutcome> {
    let lowered = error.to_lowercase();

    if is_write_tool(tool_name) && (lowered.contains("not found") || lowered.contains("no such file")) {
        return recover_missing_parent(tool_name, args, registry, events).await;
    }

    if tool_name == "bash" && lowered.contains("permission denied") {
        return recover_permission_denied(args, registry, events).await;
    }

    if matches!(tool_name, "web" | "search" | "fetch") && (lowered.contains("timeout") || lowered.contains("network")) {
        info!(tool = tool_name, "recovery: waiting {:?} before network retry", NETWORK_RETRY_DELAY);
        events.status("network hiccup, retrying in 2s");
        tokio::time::sleep(NETWORK_RETRY_DELAY).await;
        return Some(registry.execute(tool_name, args).await);
    }

    debug!(tool = tool_name, error, "recovery: no rule applies");
    None
}

/// Create the missing parent directory, then retry the write once
async fn recover_missing_parent(
    tool_name: &str,
    args: &Value,
    registry: &ToolRegistry,
    events: &EventEmitter,
) -> Option<ToolOutcome> {
    let path = args.get("file_path").or_else(|| args.get("path"))?.as_str()?;
    let parent = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())?;

    let mkdir = serde_json::json!({ "command": format!("mkdir -p {}", parent.display()) });
    events.status(format!("creating missing directory {}", parent.display()));
    let created = registry.execute("bash", &mkdir).await;
    if !created.success {
        debug!(error = created.error_message(), "recovery: mkdir failed, giving up");
        return None;
    }

    Some(registry.execute(tool_name, args).await)
}

/// Rewrite an absolute command target under /tmp, then retry once
async fn recover_permission_denied(args: &Value, registry: &ToolRegistry, events: &EventEmitter) -> Option<ToolOutcome> {
    let command = args.get("command")?.as_str()?;
    if !command.starts_with('/') {
        return None;
    }

    let (head, rest) = command.split_once(' ').unwrap_or((command, ""));
    let file_name = Path::new(head).file_name()?.to_string_lossy();
    let rewritten = if rest.is_empty() {
        format!("/tmp/{}", file_name)
    } else {
        format!("/tmp/{} {}", file_name, rest)
    };

    events.status(format!("permission denied, retrying as {}", rewritten));
    let mut retry_args = args.clone();
    retry_args["command"] = Value::String(rewritten);
    Some(registry.execute("bash", &retry_args).await)
}
