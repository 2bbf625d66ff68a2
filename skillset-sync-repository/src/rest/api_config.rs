//! Connection settings for the management REST API.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::errors::SyncError;

/// API version sent with every request unless overridden.
pub const DEFAULT_API_VERSION: &str = "2024-07-01";

/// Per-request timeout unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the search service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service root, e.g. `https://demo.search.windows.net`.
    pub endpoint: Url,
    /// Admin API key sent in the `api-key` header.
    pub api_key: SecretString,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ServiceConfig {
    /// Create a configuration with the default API version and timeout.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The service root URL
    /// * `api_key` - The admin API key
    ///
    /// # Returns
    ///
    /// * `Ok(ServiceConfig)` - The configuration
    /// * `Err(SyncError::ValidationError)` - If the endpoint is not an http(s) URL
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> Result<Self, SyncError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SyncError::validation(format!("invalid service endpoint '{}': {}", endpoint, e)))?;

        if endpoint.scheme() != "https" && endpoint.scheme() != "http" {
            return Err(SyncError::validation(format!(
                "service endpoint must be http(s), got '{}'",
                endpoint.scheme()
            )));
        }
        if endpoint.cannot_be_a_base() {
            return Err(SyncError::validation(format!(
                "service endpoint '{}' cannot be used as a base URL",
                endpoint
            )));
        }

        Ok(Self {
            endpoint,
            api_key: SecretString::from(api_key.into()),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the URL of `segments` under the endpoint, with the API version attached.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::validation("service endpoint cannot be used as a base URL"))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }
}
