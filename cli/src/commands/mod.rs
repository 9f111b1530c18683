//! CLI Commands

pub mod add;
pub mod check;
pub mod list;
pub mod remove;

use colored::Colorize;
use peersync::{PeerSyncError, SyncOutcome};
use std::fmt;

/// Command failure, split by whether the gateway was already changed
#[derive(Debug)]
pub enum Failure {
    /// Nothing was written
    Failed(String),
    /// Some stores were updated before the failure
    Partial(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Failed(msg) => write!(f, "Error: {}", msg),
            Failure::Partial(msg) => write!(f, "Partial success: {}", msg),
        }
    }
}

impl From<PeerSyncError> for Failure {
    fn from(e: PeerSyncError) -> Self {
        if e.is_partial() {
            Failure::Partial(e.to_string())
        } else {
            Failure::Failed(e.to_string())
        }
    }
}

impl From<String> for Failure {
    fn from(msg: String) -> Self {
        Failure::Failed(msg)
    }
}

/// One-line description of a live interface result
pub fn live_summary(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Applied => "applied".green().to_string(),
        SyncOutcome::Skipped { reason } => format!("{} ({})", "skipped".yellow(), reason),
        SyncOutcome::Warned {
            reason,
            remediation,
        } => format!(
            "{} ({})\n  Resync with: {}",
            "failed".red().bold(),
            reason,
            remediation.cyan()
        ),
    }
}
