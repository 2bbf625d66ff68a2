//! REST provider implementation.
//!
//! This module provides the concrete implementation of `SearchServiceProvider`
//! using `reqwest` against the service's management API.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use skillset_sync_shared::{ExecutionReport, IndexerStatusDocument, ResourceDescriptor, ResourceKind};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::SyncError;
use crate::interfaces::SearchServiceProvider;
use crate::rest::api_config::ServiceConfig;

/// Error body returned by the service: `{"error": {"code": .., "message": ..}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Search service provider backed by the management REST API.
///
/// Every request carries the admin key in `api-key` and a fresh
/// `client-request-id` so individual calls can be traced on the service side.
///
/// # Example
///
/// ```ignore
/// use skillset_sync_repository::rest::{RestSearchProvider, ServiceConfig};
///
/// let config = ServiceConfig::new("https://demo.search.windows.net", admin_key)?;
/// let provider = RestSearchProvider::new(config)?;
/// provider.ping().await?;
/// ```
pub struct RestSearchProvider {
    client: Client,
    config: ServiceConfig,
}

impl RestSearchProvider {
    /// Create a new REST provider.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, key, API version and timeout
    ///
    /// # Returns
    ///
    /// * `Ok(RestSearchProvider)` - A new provider instance
    /// * `Err(SyncError)` - If the HTTP client cannot be built
    pub fn new(config: ServiceConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::validation(format!("failed to build HTTP client: {}", e)))?;

        info!(
            endpoint = %config.endpoint,
            api_version = %config.api_version,
            timeout_secs = config.timeout.as_secs(),
            "Created REST search provider"
        );

        Ok(Self { client, config })
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, SyncError> {
        let url = self.config.url(segments)?;
        Ok(self
            .client
            .request(method, url)
            .header("api-key", self.config.api_key.expose_secret())
            .header("client-request-id", Uuid::new_v4().to_string())
            .header("Accept", "application/json"))
    }

    async fn send(&self, resource: &str, request: RequestBuilder) -> Result<Response, SyncError> {
        request
            .send()
            .await
            .map_err(|e| SyncError::unavailable(resource, e.to_string()))
    }

    /// Map a non-success response onto the error taxonomy.
    async fn failure(resource: &str, response: Response) -> SyncError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => match envelope.error.code {
                Some(code) if !code.is_empty() => format!("{} ({})", envelope.error.message, code),
                _ => envelope.error.message,
            },
            Err(_) if body.trim().is_empty() => status.to_string(),
            Err(_) => body,
        };

        error!(resource = %resource, status = %status, message = %message, "Search service request failed");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SyncError::not_authorized(resource, message)
            }
            StatusCode::NOT_FOUND => SyncError::not_found(resource),
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS => {
                SyncError::unavailable(resource, message)
            }
            s if s.is_server_error() => SyncError::unavailable(resource, message),
            _ => SyncError::rejected(resource, message),
        }
    }

    async fn json_body(resource: &str, response: Response) -> Result<Option<Value>, SyncError> {
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::unavailable(resource, e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| SyncError::parse(format!("{}: {}", resource, e)))
    }

    /// POST to an indexer action endpoint (`run`, `reset`).
    async fn indexer_action(&self, indexer_name: &str, action: &str) -> Result<(), SyncError> {
        let resource = format!("indexer '{}'", indexer_name);
        let request = self.request(Method::POST, &["indexers", indexer_name, action])?;
        let response = self.send(&resource, request).await?;

        if !response.status().is_success() {
            return Err(Self::failure(&resource, response).await);
        }

        debug!(indexer = %indexer_name, action = %action, "Indexer action accepted");
        Ok(())
    }
}

#[async_trait]
impl SearchServiceProvider for RestSearchProvider {
    async fn get(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<ResourceDescriptor>, SyncError> {
        let resource = format!("{} '{}'", kind, name);
        let request = self.request(Method::GET, &[kind.collection(), name])?;
        let response = self.send(&resource, request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(kind = %kind, name = %name, "Resource does not exist");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::failure(&resource, response).await);
        }

        let value = Self::json_body(&resource, response)
            .await?
            .ok_or_else(|| SyncError::parse(format!("{}: empty response body", resource)))?;
        let live = ResourceDescriptor::from_json(kind, value)
            .map_err(|e| SyncError::parse(format!("{}: {}", resource, e)))?;

        Ok(Some(live))
    }

    async fn create_or_update(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> Result<ResourceDescriptor, SyncError> {
        let resource = descriptor.label();
        let kind = descriptor.kind();
        let body = descriptor
            .to_json()
            .map_err(|e| SyncError::serialization(format!("{}: {}", resource, e)))?;

        let request = self
            .request(Method::PUT, &[kind.collection(), descriptor.name()])?
            .header("Prefer", "return=representation")
            .json(&body);
        let response = self.send(&resource, request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(&resource, response).await);
        }

        debug!(resource = %resource, status = %status, "Resource stored");

        // 204 when the service ignores `Prefer`; the stored object is what was sent.
        match Self::json_body(&resource, response).await? {
            Some(value) => ResourceDescriptor::from_json(kind, value)
                .map_err(|e| SyncError::parse(format!("{}: {}", resource, e))),
            None => Ok(descriptor.clone()),
        }
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), SyncError> {
        let resource = format!("{} '{}'", kind, name);
        let request = self.request(Method::DELETE, &[kind.collection(), name])?;
        let response = self.send(&resource, request).await?;

        let status = response.status();
        // 404 is acceptable - the resource may already be gone
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(Self::failure(&resource, response).await);
        }

        debug!(resource = %resource, status = %status, "Resource deleted");
        Ok(())
    }

    async fn get_execution_report(&self, indexer_name: &str) -> Result<ExecutionReport, SyncError> {
        let resource = format!("indexer '{}'", indexer_name);
        let request = self.request(Method::GET, &["indexers", indexer_name, "status"])?;
        let response = self.send(&resource, request).await?;

        if !response.status().is_success() {
            return Err(Self::failure(&resource, response).await);
        }

        let value = Self::json_body(&resource, response)
            .await?
            .ok_or_else(|| SyncError::parse(format!("{}: empty status document", resource)))?;
        let document: IndexerStatusDocument = serde_json::from_value(value)
            .map_err(|e| SyncError::parse(format!("{}: {}", resource, e)))?;

        Ok(ExecutionReport::decode(indexer_name, document)?)
    }

    async fn run_indexer(&self, indexer_name: &str) -> Result<(), SyncError> {
        self.indexer_action(indexer_name, "run").await
    }

    async fn reset_indexer(&self, indexer_name: &str) -> Result<(), SyncError> {
        self.indexer_action(indexer_name, "reset").await
    }

    async fn ping(&self) -> Result<(), SyncError> {
        let resource = "service statistics";
        let request = self.request(Method::GET, &["servicestats"])?;
        let response = self.send(resource, request).await?;

        if !response.status().is_success() {
            return Err(Self::failure(resource, response).await);
        }

        Ok(())
    }
}
