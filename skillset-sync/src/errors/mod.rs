//! Error types for a pipeline run.

use skillset_sync_repository::SyncError;
use thiserror::Error;

/// Errors that can occur while running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pipeline definition failed an offline check.
    #[error("Invalid pipeline: {0}")]
    PlanError(String),

    /// A search service call failed.
    #[error("Synchronization error: {0}")]
    SyncError(#[from] SyncError),

    /// The indexer finished its run in a failed state.
    #[error("Indexer '{indexer}' failed: {message}")]
    IndexerFailed { indexer: String, message: String },
}

impl PipelineError {
    /// Create a plan error.
    pub fn plan(msg: impl Into<String>) -> Self {
        Self::PlanError(msg.into())
    }

    /// Create an indexer failure.
    pub fn indexer_failed(indexer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IndexerFailed {
            indexer: indexer.into(),
            message: message.into(),
        }
    }
}
