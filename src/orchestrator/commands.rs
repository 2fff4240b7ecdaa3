//! Slash commands - handled in-process, without planner or executor
//!
//! Every command produces a canned textual reply and touches neither the
//! execution context nor memory, so repeating them is always safe.

use crate::approval::ApprovalDecision;
use crate::tools::ToolRegistry;

/// Reply to a slash command
#[derive(Debug, Clone)]
pub struct SlashReply {
    pub text: String,
    pub success: bool,
    /// The command asks the host loop to exit
    pub quit: bool,
}

impl SlashReply {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            quit: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
            quit: false,
        }
    }
}

/// Snapshot of orchestrator state the commands report on
pub struct CommandContext<'a> {
    pub registry: &'a ToolRegistry,
    pub approval: ApprovalDecision,
    pub monitoring_enabled: bool,
    pub runs_completed: usize,
}

/// Dispatch a slash command
///
/// `monitoring_toggle` receives the new state for `/monitor on|off`.
pub fn handle(input: &str, ctx: &CommandContext<'_>, monitoring_toggle: &mut dyn FnMut(bool)) -> SlashReply {
    let mut parts = input.trim().split_whitespace();
    let command = parts.next().unwrap_or_default();
    let argument = parts.next().unwrap_or_default();

    match command {
        "/help" | "/?" => SlashReply::ok(HELP_TEXT),
        "/status" => SlashReply::ok(format!(
            "runs completed: {}\ntools registered: {}\napproval mode: {} (session auto-approve: {}, global: {})\nmonitoring: {}",
            ctx.runs_completed,
            ctx.registry.len(),
            ctx.approval.mode,
            ctx.approval.session_auto_approve,
            ctx.approval.global_auto_approve,
            if ctx.monitoring_enabled { "on" } else { "off" },
        )),
        "/tools" => {
            if ctx.registry.is_empty() {
                SlashReply::ok("no tools registered")
            } else {
                let lines: Vec<String> = ctx
                    .registry
                    .schemas()
                    .into_iter()
                    .map(|schema| format!("{} - {}", schema.name, schema.description))
                    .collect();
                SlashReply::ok(lines.join("\n"))
            }
        }
        "/clear" => SlashReply::ok("conversation display cleared"),
        "/quit" | "/exit" => SlashReply {
            text: "bye".to_string(),
            success: true,
            quit: true,
        },
        "/monitor" => match argument {
            "on" => {
                monitoring_toggle(true);
                SlashReply::ok("monitoring enabled")
            }
            "off" => {
                monitoring_toggle(false);
                SlashReply::ok("monitoring disabled")
            }
            "status" | "" => SlashReply::ok(format!(
                "monitoring is {}",
                if ctx.monitoring_enabled { "on" } else { "off" }
            )),
            other => SlashReply::error(format!("unknown /monitor argument '{}'; use on, off, or status", other)),
        },
        other => SlashReply::error(format!("unknown command: {} (try /help)", other)),
    }
}

const HELP_TEXT: &str = "commands:\n\
    /help, /?          show this help\n\
    /status            show run and approval state\n\
    /tools             list registered tools\n\
    /clear             clear the conversation display\n\
    /monitor on|off|status  control monitoring attach\n\
    /quit, /exit       leave the session";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalMode;

    fn ctx(registry: &ToolRegistry) -> CommandContext<'_> {
        CommandContext {
            registry,
            approval: ApprovalDecision {
                mode: ApprovalMode::Default,
                session_auto_approve: false,
                global_auto_approve: false,
            },
            monitoring_enabled: false,
            runs_completed: 3,
        }
    }

    #[test]
    fn test_help() {
        let registry = ToolRegistry::new();
        let reply = handle("/help", &ctx(&registry), &mut |_| {});
        assert!(reply.success);
        assert!(reply.text.contains("/status"));

        let alias = handle("/?", &ctx(&registry), &mut |_| {});
        assert_eq!(alias.text, reply.text);
    }

    #[test]
    fn test_status_reports_state() {
        let registry = ToolRegistry::new();
        let reply = handle("/status", &ctx(&registry), &mut |_| {});
        assert!(reply.success);
        assert!(reply.text.contains("runs completed: 3"));
        assert!(reply.text.contains("approval mode: default"));
    }

    #[test]
    fn test_tools_empty_registry() {
        let registry = ToolRegistry::new();
        let reply = handle("/tools", &ctx(&registry), &mut |_| {});
        assert_eq!(reply.text, "no tools registered");
    }

    #[test]
    fn test_quit_and_exit() {
        let registry = ToolRegistry::new();
        assert!(handle("/quit", &ctx(&registry), &mut |_| {}).quit);
        assert!(handle("/exit", &ctx(&registry), &mut |_| {}).quit);
    }

    #[test]
    fn test_monitor_toggle() {
        let registry = ToolRegistry::new();
        let mut toggled = None;
        let reply = handle("/monitor on", &ctx(&registry), &mut |v| toggled = Some(v));
        assert!(reply.success);
        assert_eq!(toggled, Some(true));

        let reply = handle("/monitor off", &ctx(&registry), &mut |v| toggled = Some(v));
        assert!(reply.success);
        assert_eq!(toggled, Some(false));

        let reply = handle("/monitor status", &ctx(&registry), &mut |_| panic!("status must not toggle"));
        assert!(reply.text.contains("monitoring is off"));
    }

    #[test]
    fn test_unknown_command_is_error() {
        let registry = ToolRegistry::new();
        let reply = handle("/frobnicate", &ctx(&registry), &mut |_| {});
        assert!(!reply.success);
        assert!(reply.text.contains("unknown command"));
    }

    #[test]
    fn test_commands_are_idempotent() {
        let registry = ToolRegistry::new();
        let first = handle("/status", &ctx(&registry), &mut |_| {});
        for _ in 0..5 {
            let again = handle("/status", &ctx(&registry), &mut |_| {});
            assert_eq!(again.text, first.text);
        }
    }
}
