//! Triad CLI entry point
//!
//! Thin shell around the Orchestrator: one-shot mode with `--prompt`,
//! otherwise an interactive loop.

use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use triad::approval::{ApprovalGate, ApprovalMode, Confirmer, DenyAll};
use triad::cli::Cli;
use triad::config::Config;
use triad::events::{EventBus, create_event_bus};
use triad::llm::OpenAiClient;
use triad::orchestrator::Orchestrator;
use triad::tools::{ConfirmationDetails, ToolRegistry};

fn setup_logging() {
    let default_level = if std::env::var("DEBUG").is_ok_and(|v| v == "true") {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Console confirmation: print the operation, read y/n
struct ConsoleConfirmer;

#[async_trait]
impl Confirmer for ConsoleConfirmer {
    async fn confirm(&self, details: &ConfirmationDetails) -> bool {
        let summary = details.summary.clone();
        tokio::task::spawn_blocking(move || {
            print!("{} {} [y/N] ", "approve?".yellow(), summary);
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return false;
            }
            matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

fn resolve_approval_mode(cli: &Cli) -> Result<ApprovalMode> {
    // APPROVAL_MODE overrides the flag
    if let Ok(value) = std::env::var("APPROVAL_MODE") {
        return ApprovalMode::from_str(&value).map_err(|e| eyre!(e));
    }
    Ok(cli.approval_mode.unwrap_or_default())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let approval_mode = resolve_approval_mode(&cli)?;

    let bus = create_event_bus();
    spawn_event_logger(&bus);

    // Client-level events (retry, timeout, token usage) are bound to the
    // component; run association comes from interleaving
    let llm = OpenAiClient::from_config(&config.llm, bus.emitter_for("llm"))
        .map_err(|e| eyre!("LLM client setup failed: {}", e))?;

    // Tools are registered by embedding hosts; the bare CLI ships none
    let registry = Arc::new(ToolRegistry::with_timeout(std::time::Duration::from_millis(
        config.executor.tool_timeout_ms,
    )));

    let confirmer: Arc<dyn Confirmer> = if cli.non_interactive {
        Arc::new(DenyAll)
    } else {
        Arc::new(ConsoleConfirmer)
    };

    let monitoring = cli.with_monitoring || config.monitoring.enabled;
    if monitoring {
        tracing::info!(port = config.monitoring.port, "monitoring attach enabled");
    }

    let orchestrator = Orchestrator::new(
        Arc::new(llm),
        registry,
        Arc::new(ApprovalGate::new(approval_mode, confirmer)),
        bus,
    )
    .with_executor_config(config.executor.clone())
    .with_monitoring(monitoring);

    match cli.prompt {
        Some(prompt) => {
            let response = orchestrator.execute(&prompt).await;
            if let Some(text) = &response.response {
                println!("{}", text);
            }
            if let Some(error) = &response.error
                && response.response.is_none()
            {
                eprintln!("{} {}", "error:".red(), error);
            }
            std::process::exit(if response.success { 0 } else { 1 });
        }
        None => interactive_loop(&orchestrator).await,
    }
}

/// Interactive mode: read, execute, print, repeat
async fn interactive_loop(orchestrator: &Orchestrator) -> Result<()> {
    println!("{}", "triad - type a request, or /help".bold());
    let mut editor = DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;

    loop {
        let line = match editor.readline(&format!("{} ", ">".bright_green())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(eyre!("readline error: {}", e)),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        let response = orchestrator.execute(input).await;
        match (&response.response, &response.error) {
            (Some(text), _) if response.success => println!("{}", text),
            (Some(text), _) => println!("{}", text.red()),
            (None, Some(error)) => println!("{} {}", "error:".red(), error),
            (None, None) => {}
        }

        if response.quit {
            return Ok(());
        }
    }
}

/// Drain bus events into the tracing log
fn spawn_event_logger(bus: &Arc<EventBus>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    debug!(
                        seq = envelope.seq,
                        run_id = envelope.event.run_id(),
                        event = envelope.event.event_type(),
                        "event"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
