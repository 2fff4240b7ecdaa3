//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::approval::ApprovalMode;

/// Triad - LLM-driven task agent
#[derive(Parser)]
#[command(
    name = "triad",
    about = "Planner/Executor/Orchestrator agent for LLM-driven task automation",
    version,
    after_help = "Environment: API_KEY or AZURE_API_KEY (required), ENDPOINT or AZURE_ENDPOINT_URL (required),\n\
                  MODEL/AZURE_MODEL, API_VERSION, APPROVAL_MODE, DEBUG=true, ENABLE_MONITORING, MONITORING_PORT"
)]
pub struct Cli {
    /// Run one prompt non-interactively and exit
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Suppress prompts; any confirmation is denied by default
    #[arg(long)]
    pub non_interactive: bool,

    /// Approval policy: default, auto_edit, or yolo
    #[arg(long, value_name = "MODE")]
    pub approval_mode: Option<ApprovalMode>,

    /// Attach the monitoring sidecar at startup
    #[arg(long)]
    pub with_monitoring: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}
