//! Error types for the skillset synchronizer repository.
//!
//! This module provides a unified error type for every search service
//! operation and for the synchronizer built on top of it.

mod sync_error;

pub use sync_error::SyncError;
