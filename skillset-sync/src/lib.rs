//! # Skillset Sync
//!
//! Keeps an AI enrichment pipeline on a managed search service in line with
//! its local definition, then follows the indexer run to completion.
//!
//! ## Architecture
//!
//! A run goes through four stages:
//!
//! 1. **Plan**: The data source, skillset, index and indexer are built and checked offline
//! 2. **Synchronize**: Each resource is created, updated or left alone, in dependency order
//! 3. **Run**: The indexer is started if the service did not start it on creation
//! 4. **Monitor**: The indexer status is polled until it reaches a terminal outcome
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`demo`]: The demo pipeline definition
//! - [`plan`]: The pipeline as a unit and its offline checks
//! - [`orchestrator`]: Coordinates a run
//! - [`errors`]: Error types for a run

pub mod config;
pub mod demo;
pub mod errors;
pub mod orchestrator;
pub mod plan;

pub use config::{ConnectionMode, Dependencies, PipelineAction, ServiceMode, Settings};
pub use errors::PipelineError;
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunSummary};
pub use plan::PipelinePlan;

use thiserror::Error;

/// Errors that can occur during initialization or a run.
#[derive(Error, Debug)]
pub enum SetupError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The search service could not be reached at startup.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),
}

impl SetupError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }
}
