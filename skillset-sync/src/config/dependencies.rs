//! Dependency initialization and wiring for a pipeline run.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{ConnectionMode, ServiceMode, Settings};
use crate::demo;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::SetupError;
use skillset_sync_repository::{SearchServiceProvider, SearchServiceSource, SynchronizerConfig};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the settings.
    ///
    /// Builds the provider for the configured service mode, waits for the
    /// service to answer, then builds and checks the demo pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(SetupError)` - If the service cannot be reached (only in fail-fast mode)
    ///   or the pipeline definition is invalid
    pub async fn new(settings: &Settings) -> Result<Self, SetupError> {
        info!(
            service_mode = ?settings.service_mode,
            endpoint = settings.service.as_ref().map(|s| s.endpoint.as_str()).unwrap_or("in-memory"),
            action = ?settings.action,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let source = match (settings.service_mode, &settings.service) {
            (ServiceMode::Mock, _) => SearchServiceSource::mock(),
            (ServiceMode::Live, Some(config)) => SearchServiceSource::live(config.clone()),
            (ServiceMode::Live, None) => {
                return Err(SetupError::config("live mode needs a service configuration"));
            }
        };
        let provider = source
            .into_provider()
            .map_err(|e| SetupError::config(format!("Failed to create search service provider: {}", e)))?;

        Self::connect(provider.as_ref(), settings.connection_mode, settings.retry_interval).await?;

        info!("Search service connection established");

        let plan = demo::pipeline(&settings.blob_connection_string);
        plan.validate()?;

        let synchronizer_config = SynchronizerConfig {
            force_replace: settings.force_replace,
            ..SynchronizerConfig::default()
        }
        .with_base_document(plan.base_document());

        let orchestrator = Orchestrator::with_config(
            provider,
            plan,
            synchronizer_config,
            settings.poller.clone(),
            OrchestratorConfig {
                action: settings.action,
                run_indexer: settings.run_indexer,
                sync_timeout: settings.sync_timeout,
            },
        );

        Ok(Self { orchestrator })
    }

    /// Wait for the service to answer, retrying based on connection mode.
    async fn connect(
        provider: &dyn SearchServiceProvider,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<(), SetupError> {
        loop {
            match provider.ping().await {
                Ok(()) => return Ok(()),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(SetupError::connection(format!(
                            "Failed to reach the search service: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry if e.is_transient() => {
                        warn!(
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to reach the search service, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                    // A rejected key will not start working on its own.
                    ConnectionMode::Retry => {
                        return Err(SetupError::connection(format!(
                            "Search service refused the connection: {}",
                            e
                        )));
                    }
                },
            }
        }
    }
}
