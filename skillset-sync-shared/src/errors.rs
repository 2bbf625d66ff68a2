//! Descriptor error types.
//!
//! Raised by the offline checks on descriptors (schema rules, enrichment step
//! ordering, field mapping targets) and by status decoding.

use thiserror::Error;

/// Errors found while checking or decoding descriptors locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The index schema breaks a field rule.
    #[error("Invalid index schema: {0}")]
    SchemaError(String),

    /// The enrichment pipeline reads a path that is not available yet.
    #[error("Invalid enrichment pipeline: {0}")]
    PipelineError(String),

    /// A field mapping points at a missing source or target.
    #[error("Invalid field mapping: {0}")]
    FieldMappingError(String),

    /// The indexer references a resource other than the one it is checked against.
    #[error("Invalid reference: {0}")]
    ReferenceError(String),

    /// The service reported a status outside the known vocabulary.
    #[error("Unrecognized status: {0}")]
    UnrecognizedStatus(String),
}

impl DescriptorError {
    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a pipeline error.
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::PipelineError(msg.into())
    }

    /// Create a field mapping error.
    pub fn field_mapping(msg: impl Into<String>) -> Self {
        Self::FieldMappingError(msg.into())
    }

    /// Create a reference error.
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Create an unrecognized status error.
    pub fn unrecognized_status(raw: impl Into<String>) -> Self {
        Self::UnrecognizedStatus(raw.into())
    }
}
