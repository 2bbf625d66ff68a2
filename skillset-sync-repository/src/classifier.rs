//! Execution status classification.
//!
//! Maps an [`ExecutionReport`] onto an [`OutcomeCategory`] and a one-line hint
//! for operators.

use std::fmt;

use skillset_sync_shared::{ExecutionReport, ExecutionStatus};

/// What an execution status means for whoever is waiting on the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeCategory {
    /// No status is available yet.
    Indeterminate,
    /// The run failed.
    Failed,
    /// A run is underway or about to start.
    InProgress,
    /// The run completed with no failures.
    Succeeded,
    /// The run completed but some items failed.
    Degraded,
}

impl OutcomeCategory {
    /// Whether waiting longer can change the outcome.
    pub fn is_terminal(&self) -> bool {
        match self {
            OutcomeCategory::Failed | OutcomeCategory::Succeeded | OutcomeCategory::Degraded => true,
            OutcomeCategory::Indeterminate | OutcomeCategory::InProgress => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeCategory::Indeterminate => "indeterminate",
            OutcomeCategory::Failed => "failed",
            OutcomeCategory::InProgress => "in-progress",
            OutcomeCategory::Succeeded => "succeeded",
            OutcomeCategory::Degraded => "degraded",
        }
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an execution report.
///
/// Total over [`ExecutionStatus`]: adding a status variant fails to compile
/// here until it is classified.
pub fn classify(report: &ExecutionReport) -> (OutcomeCategory, &'static str) {
    match report.status {
        ExecutionStatus::Unknown => (OutcomeCategory::Indeterminate, "status not yet available"),
        ExecutionStatus::Error => (
            OutcomeCategory::Failed,
            "execution failed — inspect lastResult for details",
        ),
        ExecutionStatus::Running => (OutcomeCategory::InProgress, "execution in progress"),
        ExecutionStatus::Success => (
            OutcomeCategory::Succeeded,
            "execution completed with no failures",
        ),
        ExecutionStatus::Reset => (
            OutcomeCategory::InProgress,
            "execution was reset and will re-run",
        ),
        ExecutionStatus::PartiallySucceeded => (
            OutcomeCategory::Degraded,
            "execution completed; see lastResult.failedItemCount",
        ),
    }
}
