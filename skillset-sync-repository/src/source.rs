//! Choice between the live search service and the in-memory one.

use std::sync::Arc;

use crate::errors::SyncError;
use crate::interfaces::SearchServiceProvider;
use crate::mock::InMemorySearchService;
use crate::rest::{RestSearchProvider, ServiceConfig};

/// Configuration for the search service backend.
///
/// # Example
///
/// ```ignore
/// use skillset_sync_repository::SearchServiceSource;
///
/// // Offline runs and tests
/// let provider = SearchServiceSource::mock().into_provider()?;
///
/// // Production
/// let provider = SearchServiceSource::live(config).into_provider()?;
/// ```
#[derive(Debug, Clone)]
pub enum SearchServiceSource {
    /// Use an empty in-memory service.
    Mock,

    /// Connect to the management REST API.
    Live {
        /// Endpoint, key, API version and timeout.
        config: ServiceConfig,
    },
}

impl SearchServiceSource {
    pub fn mock() -> Self {
        Self::Mock
    }

    pub fn live(config: ServiceConfig) -> Self {
        Self::Live { config }
    }

    /// Create the provider for this source.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<dyn SearchServiceProvider>)` - The provider
    /// * `Err(SyncError)` - If the HTTP client cannot be built
    pub fn into_provider(self) -> Result<Arc<dyn SearchServiceProvider>, SyncError> {
        Ok(match self {
            Self::Mock => Arc::new(InMemorySearchService::new()),
            Self::Live { config } => Arc::new(RestSearchProvider::new(config)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_answers_ping() {
        let provider = SearchServiceSource::mock().into_provider().unwrap();
        assert!(provider.ping().await.is_ok());
    }

    #[test]
    fn test_live_source_builds_provider() {
        let config = ServiceConfig::new("https://demo.search.windows.net", "key").unwrap();
        assert!(SearchServiceSource::live(config).into_provider().is_ok());
    }
}
