//! Resource synchronizer.
//!
//! Brings one named remote resource in line with a local descriptor: create
//! it when missing, replace it when it differs, leave it alone otherwise.
//! Whole-pipeline runs go through [`ResourceSynchronizer::synchronize_all`],
//! which applies descriptors in dependency order.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use skillset_sync_shared::{ResourceDescriptor, ResourceKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::SynchronizerConfig;
use crate::errors::SyncError;
use crate::interfaces::SearchServiceProvider;
use crate::validation::{validate_descriptor, validate_name};

/// What synchronizing one descriptor did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncResult {
    /// The resource did not exist and was created.
    Created,
    /// The resource existed with a different definition and was replaced.
    Updated,
    /// The resource already matched; nothing was written.
    Unchanged,
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncResult::Created => "created",
            SyncResult::Updated => "updated",
            SyncResult::Unchanged => "unchanged",
        })
    }
}

/// One completed step of a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub kind: ResourceKind,
    pub name: String,
    pub result: SyncResult,
}

/// Completed steps of a synchronization run, in the order they ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    fn count(&self, result: SyncResult) -> usize {
        self.outcomes.iter().filter(|o| o.result == result).count()
    }

    pub fn created(&self) -> usize {
        self.count(SyncResult::Created)
    }

    pub fn updated(&self) -> usize {
        self.count(SyncResult::Updated)
    }

    pub fn unchanged(&self) -> usize {
        self.count(SyncResult::Unchanged)
    }

    /// Whether the run wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.outcomes.iter().all(|o| o.result == SyncResult::Unchanged)
    }

    /// The result recorded for a resource, if it was part of the run.
    pub fn result_for(&self, kind: ResourceKind, name: &str) -> Option<SyncResult> {
        self.outcomes
            .iter()
            .find(|o| o.kind == kind && o.name == name)
            .map(|o| o.result)
    }
}

/// Drives remote resources towards local descriptors.
///
/// Holds no state between calls besides its configuration. Provider errors
/// are returned as they are; retrying is left to the caller.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use skillset_sync_repository::{InMemorySearchService, ResourceSynchronizer, SyncResult};
///
/// let synchronizer = ResourceSynchronizer::new(Arc::new(InMemorySearchService::new()));
/// assert_eq!(synchronizer.synchronize(&descriptor).await?, SyncResult::Created);
/// assert_eq!(synchronizer.synchronize(&descriptor).await?, SyncResult::Unchanged);
/// ```
pub struct ResourceSynchronizer {
    provider: Arc<dyn SearchServiceProvider>,
    config: SynchronizerConfig,
}

impl ResourceSynchronizer {
    /// Create a synchronizer with default configuration.
    ///
    /// # Arguments
    ///
    /// * `provider` - The search service to synchronize against
    pub fn new(provider: Arc<dyn SearchServiceProvider>) -> Self {
        Self {
            provider,
            config: SynchronizerConfig::default(),
        }
    }

    /// Create a synchronizer with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `provider` - The search service to synchronize against
    /// * `config` - Equality short-circuit and base document settings
    pub fn with_config(provider: Arc<dyn SearchServiceProvider>, config: SynchronizerConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &SynchronizerConfig {
        &self.config
    }

    /// Ensure the remote resource matches `descriptor`.
    ///
    /// The descriptor is checked locally first; a rejected descriptor never
    /// causes a network call. An existing resource is replaced with a single
    /// create-or-update call, never deleted first.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncResult)` - What was done
    /// * `Err(SyncError::ValidationError)` - If the descriptor fails a local check
    /// * `Err(SyncError::ValidationRejected)` - If the service refuses the definition
    /// * `Err(SyncError::NotAuthorized)` - If the credentials are refused
    /// * `Err(SyncError::RemoteUnavailable)` - If the service cannot be reached
    #[instrument(skip(self, descriptor), fields(kind = %descriptor.kind(), name = %descriptor.name()))]
    pub async fn synchronize(&self, descriptor: &ResourceDescriptor) -> Result<SyncResult, SyncError> {
        validate_descriptor(descriptor, &self.config.base_document)?;

        let live = match self.provider.get(descriptor.kind(), descriptor.name()).await {
            Ok(live) => live,
            Err(SyncError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let result = match live {
            None => {
                self.provider.create_or_update(descriptor).await?;
                SyncResult::Created
            }
            Some(live) if !self.config.force_replace && descriptor.is_satisfied_by(&live) => {
                SyncResult::Unchanged
            }
            Some(_) => {
                self.provider.create_or_update(descriptor).await?;
                SyncResult::Updated
            }
        };

        info!(result = %result, "Synchronized {}", descriptor.label());
        Ok(result)
    }

    /// Synchronize a set of descriptors in dependency order.
    ///
    /// Descriptors are sorted by kind (data sources, skillsets, indexes,
    /// indexers) and applied one at a time. The first error stops the run.
    /// `cancel` is checked before each step; steps already applied stay
    /// applied and are returned in [`SyncError::Cancelled`].
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReport)` - Every step completed
    /// * `Err(SyncError::ValidationError)` - If the same kind and name appears twice
    /// * `Err(SyncError::Cancelled)` - If `cancel` fired between steps
    /// * `Err(SyncError)` - The first step error
    #[instrument(skip_all, fields(descriptor_count = descriptors.len()))]
    pub async fn synchronize_all(
        &self,
        descriptors: &[ResourceDescriptor],
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let mut seen = HashSet::new();
        for descriptor in descriptors {
            if !seen.insert((descriptor.kind(), descriptor.name())) {
                return Err(SyncError::validation(format!(
                    "{} appears more than once",
                    descriptor.label()
                )));
            }
        }

        let mut ordered: Vec<&ResourceDescriptor> = descriptors.iter().collect();
        ordered.sort_by_key(|d| d.kind().rank());

        let mut report = SyncReport::default();
        for descriptor in ordered {
            if cancel.is_cancelled() {
                warn!(
                    completed = report.outcomes.len(),
                    next = %descriptor.label(),
                    "Synchronization cancelled"
                );
                return Err(SyncError::Cancelled {
                    completed: report.outcomes,
                });
            }

            let result = self.synchronize(descriptor).await?;
            report.outcomes.push(SyncOutcome {
                kind: descriptor.kind(),
                name: descriptor.name().to_string(),
                result,
            });
        }

        info!(
            created = report.created(),
            updated = report.updated(),
            unchanged = report.unchanged(),
            "Synchronization finished"
        );
        Ok(report)
    }

    /// Delete a remote resource. A missing resource counts as deleted.
    #[instrument(skip(self))]
    pub async fn remove(&self, kind: ResourceKind, name: &str) -> Result<(), SyncError> {
        validate_name(kind, name)?;
        self.provider.delete(kind, name).await?;
        info!("Removed {} '{}'", kind, name);
        Ok(())
    }

    /// Delete every resource named by `descriptors`, dependents first.
    ///
    /// Runs in reverse dependency order so the indexer goes before the
    /// resources it references. Stops on the first error.
    ///
    /// # Returns
    ///
    /// The number of delete calls made.
    #[instrument(skip_all, fields(descriptor_count = descriptors.len()))]
    pub async fn teardown(&self, descriptors: &[ResourceDescriptor]) -> Result<usize, SyncError> {
        let mut ordered: Vec<&ResourceDescriptor> = descriptors.iter().collect();
        ordered.sort_by_key(|d| std::cmp::Reverse(d.kind().rank()));

        let mut removed = 0;
        for descriptor in ordered {
            debug!(resource = %descriptor.label(), "Tearing down");
            self.remove(descriptor.kind(), descriptor.name()).await?;
            removed += 1;
        }

        info!(removed, "Teardown finished");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skillset_sync_shared::{
        ExecutionReport, FieldType, IndexSchema, SearchField,
    };
    use std::sync::Mutex;

    /// Mock provider recording every call.
    struct MockProvider {
        live: Option<ResourceDescriptor>,
        calls: Mutex<Vec<String>>,
        get_error: Option<SyncError>,
    }

    impl MockProvider {
        fn new(live: Option<ResourceDescriptor>) -> Self {
            Self {
                live,
                calls: Mutex::new(Vec::new()),
                get_error: None,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchServiceProvider for MockProvider {
        async fn get(
            &self,
            kind: ResourceKind,
            name: &str,
        ) -> Result<Option<ResourceDescriptor>, SyncError> {
            self.calls.lock().unwrap().push(format!("get {} {}", kind.collection(), name));
            if let Some(e) = &self.get_error {
                return Err(e.clone());
            }
            Ok(self.live.clone())
        }

        async fn create_or_update(
            &self,
            descriptor: &ResourceDescriptor,
        ) -> Result<ResourceDescriptor, SyncError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("put {} {}", descriptor.kind().collection(), descriptor.name()));
            Ok(descriptor.clone())
        }

        async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), SyncError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete {} {}", kind.collection(), name));
            Ok(())
        }

        async fn get_execution_report(&self, indexer_name: &str) -> Result<ExecutionReport, SyncError> {
            Ok(ExecutionReport::unknown(indexer_name))
        }

        async fn run_indexer(&self, _indexer_name: &str) -> Result<(), SyncError> {
            Ok(())
        }

        async fn reset_indexer(&self, _indexer_name: &str) -> Result<(), SyncError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), SyncError> {
            Ok(())
        }
    }

    fn index(name: &str) -> ResourceDescriptor {
        IndexSchema::new(
            name,
            vec![SearchField::key("id"), SearchField::searchable("content", FieldType::STRING)],
        )
        .into()
    }

    #[tokio::test]
    async fn test_missing_resource_is_created() {
        let provider = Arc::new(MockProvider::new(None));
        let synchronizer = ResourceSynchronizer::new(provider.clone());

        let result = synchronizer.synchronize(&index("demoindex")).await.unwrap();

        assert_eq!(result, SyncResult::Created);
        assert_eq!(provider.calls(), vec!["get indexes demoindex", "put indexes demoindex"]);
    }

    #[tokio::test]
    async fn test_matching_resource_is_left_alone() {
        let provider = Arc::new(MockProvider::new(Some(index("demoindex"))));
        let synchronizer = ResourceSynchronizer::new(provider.clone());

        let result = synchronizer.synchronize(&index("demoindex")).await.unwrap();

        assert_eq!(result, SyncResult::Unchanged);
        assert_eq!(provider.calls(), vec!["get indexes demoindex"]);
    }

    #[tokio::test]
    async fn test_different_resource_is_replaced_without_delete() {
        let mut live = IndexSchema::new("demoindex", vec![SearchField::key("id")]);
        live.fields[0].sortable = true;
        let provider = Arc::new(MockProvider::new(Some(live.into())));
        let synchronizer = ResourceSynchronizer::new(provider.clone());

        let result = synchronizer.synchronize(&index("demoindex")).await.unwrap();

        assert_eq!(result, SyncResult::Updated);
        assert!(provider.calls().iter().all(|c| !c.starts_with("delete")));
    }

    #[tokio::test]
    async fn test_force_replace_always_writes() {
        let provider = Arc::new(MockProvider::new(Some(index("demoindex"))));
        let synchronizer =
            ResourceSynchronizer::with_config(provider.clone(), SynchronizerConfig::force_replace());

        let result = synchronizer.synchronize(&index("demoindex")).await.unwrap();

        assert_eq!(result, SyncResult::Updated);
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_name_makes_no_calls() {
        let provider = Arc::new(MockProvider::new(None));
        let synchronizer = ResourceSynchronizer::new(provider.clone());

        let err = synchronizer.synchronize(&index("Demo_Index")).await.unwrap_err();

        assert!(matches!(err, SyncError::ValidationError(_)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_from_get_means_create() {
        let mut provider = MockProvider::new(None);
        provider.get_error = Some(SyncError::not_found("index 'demoindex'"));
        let provider = Arc::new(provider);
        let synchronizer = ResourceSynchronizer::new(provider.clone());

        let result = synchronizer.synchronize(&index("demoindex")).await.unwrap();
        assert_eq!(result, SyncResult::Created);
    }

    #[tokio::test]
    async fn test_get_errors_propagate() {
        let mut provider = MockProvider::new(None);
        provider.get_error = Some(SyncError::not_authorized("index 'demoindex'", "Forbidden"));
        let synchronizer = ResourceSynchronizer::new(Arc::new(provider));

        let err = synchronizer.synchronize(&index("demoindex")).await.unwrap_err();
        assert!(matches!(err, SyncError::NotAuthorized { .. }));
    }

    #[tokio::test]
    async fn test_duplicates_are_rejected_up_front() {
        let provider = Arc::new(MockProvider::new(None));
        let synchronizer = ResourceSynchronizer::new(provider.clone());

        let err = synchronizer
            .synchronize_all(&[index("demoindex"), index("demoindex")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("more than once"));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_already_cancelled_run_does_nothing() {
        let provider = Arc::new(MockProvider::new(None));
        let synchronizer = ResourceSynchronizer::new(provider.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = synchronizer
            .synchronize_all(&[index("demoindex")], &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled { ref completed } if completed.is_empty()));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_checks_the_name() {
        let provider = Arc::new(MockProvider::new(None));
        let synchronizer = ResourceSynchronizer::new(provider.clone());

        assert!(synchronizer.remove(ResourceKind::IndexSchema, "Bad Name").await.is_err());
        synchronizer.remove(ResourceKind::IndexSchema, "demoindex").await.unwrap();
        assert_eq!(provider.calls(), vec!["delete indexes demoindex"]);
    }

    #[test]
    fn test_report_counts() {
        let report = SyncReport {
            outcomes: vec![
                SyncOutcome {
                    kind: ResourceKind::DataSource,
                    name: "demodata".to_string(),
                    result: SyncResult::Unchanged,
                },
                SyncOutcome {
                    kind: ResourceKind::IndexSchema,
                    name: "demoindex".to_string(),
                    result: SyncResult::Updated,
                },
            ],
        };
        assert_eq!(report.created(), 0);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.unchanged(), 1);
        assert!(!report.is_noop());
        assert_eq!(
            report.result_for(ResourceKind::IndexSchema, "demoindex"),
            Some(SyncResult::Updated)
        );
    }
}
