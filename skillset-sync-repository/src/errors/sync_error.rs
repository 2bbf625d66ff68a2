//! Synchronization error types.
//!
//! This module defines the unified error type for search service operations,
//! covering local validation failures, service rejections and transport
//! problems.

use skillset_sync_shared::DescriptorError;
use thiserror::Error;

use crate::synchronizer::SyncOutcome;

/// Unified errors from search service operations.
///
/// Used by the `SearchServiceProvider` trait and by `ResourceSynchronizer`.
/// `NotFound` is only surfaced by provider calls: the synchronizer consumes it
/// when deciding between create and update.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The descriptor was rejected locally, before any network call.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The service refused the definition.
    #[error("{resource} rejected by the search service: {message}")]
    ValidationRejected { resource: String, message: String },

    /// The credentials were refused.
    #[error("Not authorized to access {resource}: {message}")]
    NotAuthorized { resource: String, message: String },

    /// The service could not be reached or asked to be retried later.
    #[error("Search service unavailable while accessing {resource}: {message}")]
    RemoteUnavailable { resource: String, message: String },

    /// The named resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service reported an execution status outside the known vocabulary.
    #[error("Unrecognized status: {0}")]
    UnrecognizedStatus(String),

    /// Failed to parse a response from the service.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a descriptor for the service.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The run was cancelled between steps. Completed steps are kept remotely.
    #[error("Synchronization cancelled after {} completed step(s)", completed.len())]
    Cancelled { completed: Vec<SyncOutcome> },
}

impl SyncError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a service rejection error.
    pub fn rejected(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationRejected {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a not authorized error.
    pub fn not_authorized(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotAuthorized {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a remote unavailable error.
    pub fn unavailable(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RemoteUnavailable { .. })
    }
}

impl From<DescriptorError> for SyncError {
    fn from(err: DescriptorError) -> Self {
        match err {
            DescriptorError::UnrecognizedStatus(raw) => Self::UnrecognizedStatus(raw),
            other => Self::ValidationError(other.to_string()),
        }
    }
}
