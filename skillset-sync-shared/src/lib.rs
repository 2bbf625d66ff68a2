//! # Skillset Sync Shared
//!
//! This crate defines the value types shared across the skillset synchronizer:
//! the four remote resource descriptors (data source, skillset, index schema,
//! indexer), the enrichment steps a skillset is made of, and the execution
//! report polled from an indexer.
//!
//! Everything here is plain data. Nothing in this crate performs I/O.

pub mod errors;
pub mod types;

pub use errors::DescriptorError;
pub use types::data_source::{DataContainer, DataSourceConnection, DataSourceCredentials, DataSourceType};
pub use types::document_path::{normalize_path, BaseDocument};
pub use types::execution::{
    ExecutionReport, ExecutionResult, ExecutionStatus, IndexerStatusDocument, ItemIssue,
    RawExecutionResult, RawItemError, RawItemWarning, RunStatus,
};
pub use types::index_schema::{EdmType, FieldType, IndexSchema, SearchField};
pub use types::indexer::{
    FieldMapping, FieldMappingFunction, Indexer, IndexingParameters, IndexingSchedule,
};
pub use types::resource::{ResourceDescriptor, ResourceKind};
pub use types::skillset::{
    EnrichmentStep, EntityCategory, InputMapping, OutputMapping, SkillKind, Skillset,
    TextSplitMode,
};
