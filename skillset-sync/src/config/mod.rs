//! Configuration and dependency initialization.
//!
//! Settings come from environment variables (a `.env` file is loaded by
//! `main` first).

mod dependencies;

pub use dependencies::Dependencies;

use std::env;
use std::time::Duration;

use secrecy::SecretString;
use skillset_sync_repository::{PollerConfig, ServiceConfig};
use tracing::warn;

use crate::SetupError;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default budget for the whole synchronization in seconds.
const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 300;

/// Default delay between two indexer status requests in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default time to wait for the indexer to finish in seconds.
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 600;

/// Connection string used for the data source in mock mode when none is set.
const MOCK_BLOB_CONNECTION_STRING: &str = "UseDevelopmentStorage=true";

/// Connection mode for the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if the service cannot be reached.
    FailFast,
    /// Retry until the service answers.
    Retry,
}

impl ConnectionMode {
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "fail-fast" if not set or invalid.
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "fail-fast".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid SEARCH_CONNECTION_MODE, defaulting to 'fail-fast'");
                Self::FailFast
            }
        }
    }
}

/// Which search service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// The management REST API.
    Live,
    /// An in-memory service; nothing leaves the process.
    Mock,
}

impl ServiceMode {
    fn parse(value: Option<String>) -> Result<Self, SetupError> {
        match value.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("live") => Ok(Self::Live),
            Some("mock") => Ok(Self::Mock),
            Some(other) => Err(SetupError::config(format!(
                "SEARCH_SERVICE_MODE must be 'live' or 'mock', got '{}'",
                other
            ))),
        }
    }
}

/// What the run does with the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineAction {
    /// Create or update every resource, then follow the indexer.
    Sync,
    /// Sync, reset the indexer and follow a full run.
    Reset,
    /// Delete every resource, dependents first.
    Teardown,
}

impl PipelineAction {
    fn parse(value: Option<String>) -> Result<Self, SetupError> {
        match value.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("sync") => Ok(Self::Sync),
            Some("reset") => Ok(Self::Reset),
            Some("teardown") => Ok(Self::Teardown),
            Some(other) => Err(SetupError::config(format!(
                "PIPELINE_ACTION must be 'sync', 'reset' or 'teardown', got '{}'",
                other
            ))),
        }
    }
}

/// Everything the binary needs to know before it starts.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_mode: ServiceMode,
    /// Present in live mode.
    pub service: Option<ServiceConfig>,
    pub blob_connection_string: SecretString,
    pub action: PipelineAction,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub sync_timeout: Duration,
    pub poller: PollerConfig,
    pub force_replace: bool,
    pub run_indexer: bool,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_SERVICE_MODE`: "live" or "mock" (default: live)
    /// - `SEARCH_SERVICE_URI`: Service endpoint (required in live mode)
    /// - `SEARCH_SERVICE_ADMIN_API_KEY`: Admin API key (required in live mode)
    /// - `AZURE_BLOB_CONNECTION_STRING`: Connection string for the demo data source (required in live mode)
    /// - `SEARCH_API_VERSION`: REST API version (default: 2024-07-01)
    /// - `PIPELINE_ACTION`: "sync", "reset" or "teardown" (default: sync)
    /// - `SEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: fail-fast)
    /// - `SEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `SYNC_TIMEOUT_SECS`: Budget for the synchronization in seconds (default: 300)
    /// - `POLL_INTERVAL_SECS`: Delay between status requests in seconds (default: 5)
    /// - `POLL_TIMEOUT_SECS`: Time to wait for the indexer in seconds (default: 600)
    /// - `FORCE_REPLACE`: Write every resource even when unchanged (default: false)
    /// - `RUN_INDEXER`: Start the indexer after a sync that kept it (default: true)
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - The settings
    /// * `Err(SetupError::ConfigError)` - If a required value is missing or a value is malformed
    pub fn from_env() -> Result<Self, SetupError> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Read settings through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SetupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_mode = ServiceMode::parse(lookup("SEARCH_SERVICE_MODE"))?;
        let action = PipelineAction::parse(lookup("PIPELINE_ACTION"))?;
        let connection_mode = ConnectionMode::parse(lookup("SEARCH_CONNECTION_MODE"));

        let required = |key: &str| {
            lookup(key).ok_or_else(|| SetupError::config(format!("{} is required in live mode", key)))
        };

        let (service, blob_connection_string) = match service_mode {
            ServiceMode::Live => {
                let uri = required("SEARCH_SERVICE_URI")?;
                let api_key = required("SEARCH_SERVICE_ADMIN_API_KEY")?;
                let blob = required("AZURE_BLOB_CONNECTION_STRING")?;

                let mut config = ServiceConfig::new(&uri, api_key)
                    .map_err(|e| SetupError::config(e.to_string()))?;
                if let Some(version) = lookup("SEARCH_API_VERSION") {
                    config = config.with_api_version(version);
                }
                (Some(config), blob)
            }
            ServiceMode::Mock => (
                None,
                lookup("AZURE_BLOB_CONNECTION_STRING")
                    .unwrap_or_else(|| MOCK_BLOB_CONNECTION_STRING.to_string()),
            ),
        };

        let seconds = |key: &str, default: u64| -> Result<Duration, SetupError> {
            match lookup(key) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| SetupError::config(format!("{} must be a number of seconds: {}", key, e))),
            }
        };
        let flag = |key: &str, default: bool| -> Result<bool, SetupError> {
            match lookup(key).map(|v| v.trim().to_lowercase()) {
                None => Ok(default),
                Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
                Some(v) if matches!(v.as_str(), "0" | "false" | "no") => Ok(false),
                Some(v) => Err(SetupError::config(format!("{} must be true or false, got '{}'", key, v))),
            }
        };

        let poll_interval = seconds("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval.is_zero() {
            return Err(SetupError::config("POLL_INTERVAL_SECS must be greater than zero"));
        }
        let retry_interval = seconds("SEARCH_RETRY_INTERVAL_SECS", DEFAULT_RETRY_INTERVAL_SECS)?;
        if retry_interval.is_zero() {
            return Err(SetupError::config("SEARCH_RETRY_INTERVAL_SECS must be greater than zero"));
        }

        Ok(Self {
            service_mode,
            service,
            blob_connection_string: SecretString::from(blob_connection_string),
            action,
            connection_mode,
            retry_interval,
            sync_timeout: seconds("SYNC_TIMEOUT_SECS", DEFAULT_SYNC_TIMEOUT_SECS)?,
            poller: PollerConfig {
                interval: poll_interval,
                timeout: seconds("POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?,
            },
            force_replace: flag("FORCE_REPLACE", false)?,
            run_indexer: flag("RUN_INDEXER", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_mock_mode_needs_nothing() {
        let settings = Settings::from_lookup(lookup(&[("SEARCH_SERVICE_MODE", "mock")])).unwrap();

        assert_eq!(settings.service_mode, ServiceMode::Mock);
        assert!(settings.service.is_none());
        assert_eq!(settings.action, PipelineAction::Sync);
        assert_eq!(settings.connection_mode, ConnectionMode::FailFast);
        assert_eq!(settings.poller.interval, Duration::from_secs(5));
        assert!(settings.run_indexer);
        assert!(!settings.force_replace);
        assert_eq!(settings.blob_connection_string.expose_secret(), MOCK_BLOB_CONNECTION_STRING);
    }

    #[test]
    fn test_live_mode_requires_credentials() {
        let err = Settings::from_lookup(lookup(&[("SEARCH_SERVICE_URI", "https://demo.search.windows.net")]))
            .unwrap_err();
        assert!(err.to_string().contains("SEARCH_SERVICE_ADMIN_API_KEY"), "err={}", err);
    }

    #[test]
    fn test_live_mode() {
        let settings = Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_URI", "https://demo.search.windows.net"),
            ("SEARCH_SERVICE_ADMIN_API_KEY", "admin-key"),
            ("AZURE_BLOB_CONNECTION_STRING", "AccountKey=abc"),
            ("SEARCH_API_VERSION", "2023-11-01"),
            ("PIPELINE_ACTION", "Teardown"),
            ("SEARCH_CONNECTION_MODE", "retry"),
            ("POLL_TIMEOUT_SECS", "30"),
            ("FORCE_REPLACE", "true"),
        ]))
        .unwrap();

        let service = settings.service.unwrap();
        assert_eq!(service.endpoint.as_str(), "https://demo.search.windows.net/");
        assert_eq!(service.api_version, "2023-11-01");
        assert_eq!(settings.action, PipelineAction::Teardown);
        assert_eq!(settings.connection_mode, ConnectionMode::Retry);
        assert_eq!(settings.poller.timeout, Duration::from_secs(30));
        assert!(settings.force_replace);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_MODE", "mock"),
            ("POLL_INTERVAL_SECS", "soon"),
        ]))
        .is_err());
        assert!(Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_MODE", "mock"),
            ("POLL_INTERVAL_SECS", "0"),
        ]))
        .is_err());
        assert!(Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_MODE", "mock"),
            ("FORCE_REPLACE", "maybe"),
        ]))
        .is_err());
        assert!(Settings::from_lookup(lookup(&[("SEARCH_SERVICE_MODE", "staging")])).is_err());
        assert!(Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_MODE", "mock"),
            ("PIPELINE_ACTION", "rebuild"),
        ]))
        .is_err());
    }

    #[test]
    fn test_zero_retry_interval_is_rejected() {
        let err = Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_MODE", "mock"),
            ("SEARCH_RETRY_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SEARCH_RETRY_INTERVAL_SECS"), "err={}", err);

        let settings = Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_MODE", "mock"),
            ("SEARCH_RETRY_INTERVAL_SECS", "2"),
        ]))
        .unwrap();
        assert_eq!(settings.retry_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_reset_action() {
        let settings = Settings::from_lookup(lookup(&[
            ("SEARCH_SERVICE_MODE", "mock"),
            ("PIPELINE_ACTION", "RESET"),
        ]))
        .unwrap();
        assert_eq!(settings.action, PipelineAction::Reset);
    }

    #[test]
    fn test_unknown_connection_mode_falls_back() {
        assert_eq!(ConnectionMode::parse(Some("sometimes".to_string())), ConnectionMode::FailFast);
        assert_eq!(ConnectionMode::parse(Some("RETRY".to_string())), ConnectionMode::Retry);
        assert_eq!(ConnectionMode::parse(None), ConnectionMode::FailFast);
    }
}
