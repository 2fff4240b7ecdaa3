//! Approval gate - policy deciding when a tool invocation needs confirmation
//!
//! The gate is a pure policy over (tool, args, mode, session state). The UI
//! side effect of actually asking - console prompt, IDE diff - is injected
//! as a [`Confirmer`] capability.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::AgentError;
use crate::tools::{ConfirmationDetails, Tool};

/// Process-sticky auto-approve, set once yolo mode confirms anything
static GLOBAL_AUTO_APPROVE: AtomicBool = AtomicBool::new(false);

/// Approval policy mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalMode {
    /// Every guarded operation asks
    #[default]
    Default,
    /// Edits auto-approve after the first confirmation
    AutoEdit,
    /// Everything auto-approves, process-wide
    Yolo,
}

impl FromStr for ApprovalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "auto_edit" | "auto-edit" => Ok(Self::AutoEdit),
            "yolo" => Ok(Self::Yolo),
            _ => Err(format!("Unknown approval mode: {}. Use: default, auto_edit, or yolo", s)),
        }
    }
}

impl std::fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::AutoEdit => write!(f, "auto_edit"),
            Self::Yolo => write!(f, "yolo"),
        }
    }
}

/// Snapshot of the gate's state, for `/status` and logs
#[derive(Debug, Clone, Copy)]
pub struct ApprovalDecision {
    pub mode: ApprovalMode,
    pub session_auto_approve: bool,
    pub global_auto_approve: bool,
}

/// Capability that performs the actual confirmation side effect
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Ask for confirmation; `true` approves the operation
    async fn confirm(&self, details: &ConfirmationDetails) -> bool;
}

/// Confirmer that denies everything (non-interactive default)
pub struct DenyAll;

#[async_trait]
impl Confirmer for DenyAll {
    async fn confirm(&self, _details: &ConfirmationDetails) -> bool {
        false
    }
}

/// Confirmer that approves everything (tests, trusted hosts)
pub struct AllowAll;

#[async_trait]
impl Confirmer for AllowAll {
    async fn confirm(&self, _details: &ConfirmationDetails) -> bool {
        true
    }
}

/// Decides whether a tool invocation may proceed
pub struct ApprovalGate {
    mode: ApprovalMode,
    session_auto_approve: AtomicBool,
    confirmer: Arc<dyn Confirmer>,
}

impl ApprovalGate {
    /// Create a gate with the given mode and confirmation capability
    pub fn new(mode: ApprovalMode, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            mode,
            session_auto_approve: AtomicBool::new(false),
            confirmer,
        }
    }

    /// Snapshot of the current policy state
    pub fn decision(&self) -> ApprovalDecision {
        ApprovalDecision {
            mode: self.mode,
            session_auto_approve: self.session_auto_approve.load(Ordering::SeqCst),
            global_auto_approve: GLOBAL_AUTO_APPROVE.load(Ordering::SeqCst),
        }
    }

    /// Review one tool invocation before it runs
    ///
    /// Unguarded tools always pass. Guarded ones pass when yolo or a prior
    /// session/global approval short-circuits, otherwise the confirmer is
    /// asked. A confirmed operation flips the session override when the
    /// mode is not `Default`.
    pub async fn review(&self, tool: &dyn Tool, args: &Value) -> Result<(), AgentError> {
        let Some(details) = tool.should_confirm(args) else {
            return Ok(());
        };

        if self.mode == ApprovalMode::Yolo {
            GLOBAL_AUTO_APPROVE.store(true, Ordering::SeqCst);
            debug!(tool = tool.name(), "ApprovalGate::review: yolo auto-approve");
            return Ok(());
        }

        if GLOBAL_AUTO_APPROVE.load(Ordering::SeqCst) || self.session_auto_approve.load(Ordering::SeqCst) {
            debug!(tool = tool.name(), "ApprovalGate::review: prior approval short-circuits");
            return Ok(());
        }

        if self.confirmer.confirm(&details).await {
            if self.mode != ApprovalMode::Default {
                self.session_auto_approve.store(true, Ordering::SeqCst);
            }
            Ok(())
        } else {
            Err(AgentError::ApprovalDenied(details.summary))
        }
    }

    #[cfg(test)]
    pub(crate) fn reset_global() {
        GLOBAL_AUTO_APPROVE.store(false, Ordering::SeqCst);
    }
}
