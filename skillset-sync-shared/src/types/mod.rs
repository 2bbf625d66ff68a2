//! This module defines the descriptor types handed to the search service and
//! the reports read back from it.

pub mod data_source;
pub mod document_path;
pub mod execution;
pub mod index_schema;
pub mod indexer;
pub mod resource;
pub mod skillset;
