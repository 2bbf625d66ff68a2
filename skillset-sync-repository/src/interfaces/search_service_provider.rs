//! Search service provider trait definition.
//!
//! This module defines the abstract interface to the remote search service's
//! management API: named resources addressed by kind and name, plus the
//! indexer execution endpoints.

use async_trait::async_trait;
use skillset_sync_shared::{ExecutionReport, ResourceDescriptor, ResourceKind};

use crate::errors::SyncError;

/// Abstracts the management API of the search service.
///
/// Implementations are injected into `ResourceSynchronizer` and
/// `StatusPoller`. Production code uses `RestSearchProvider`; tests and the
/// offline mode use `InMemorySearchService`.
///
/// All methods return `Result<T, SyncError>` with the service's status codes
/// already mapped onto the error taxonomy. Implementations do not retry.
#[async_trait]
pub trait SearchServiceProvider: Send + Sync {
    /// Fetch the live definition of a named resource.
    ///
    /// # Arguments
    ///
    /// * `kind` - The resource kind
    /// * `name` - The resource name
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ResourceDescriptor))` - The live definition as the service reports it
    /// * `Ok(None)` - If no resource of that kind and name exists
    /// * `Err(SyncError)` - If the lookup fails
    async fn get(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<ResourceDescriptor>, SyncError>;

    /// Create the resource, or fully replace it if it exists.
    ///
    /// The whole payload is sent; attributes missing from `descriptor` are
    /// dropped from the remote object.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The desired definition
    ///
    /// # Returns
    ///
    /// * `Ok(ResourceDescriptor)` - The definition as stored by the service
    /// * `Err(SyncError::ValidationRejected)` - If the service refuses the definition
    /// * `Err(SyncError)` - If the call fails
    async fn create_or_update(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> Result<ResourceDescriptor, SyncError>;

    /// Delete a named resource.
    ///
    /// If the resource doesn't exist, the operation is considered successful.
    ///
    /// # Arguments
    ///
    /// * `kind` - The resource kind
    /// * `name` - The resource name
    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), SyncError>;

    /// Fetch a fresh execution report for an indexer.
    ///
    /// # Returns
    ///
    /// * `Ok(ExecutionReport)` - The decoded status
    /// * `Err(SyncError::NotFound)` - If the indexer doesn't exist
    /// * `Err(SyncError::UnrecognizedStatus)` - If the service reports a status outside the known vocabulary
    async fn get_execution_report(&self, indexer_name: &str) -> Result<ExecutionReport, SyncError>;

    /// Start an on-demand run of an indexer.
    async fn run_indexer(&self, indexer_name: &str) -> Result<(), SyncError>;

    /// Reset an indexer's change tracking so the next run processes every document.
    async fn reset_indexer(&self, indexer_name: &str) -> Result<(), SyncError>;

    /// A cheap authenticated call used to check connectivity at startup.
    async fn ping(&self) -> Result<(), SyncError>;
}
