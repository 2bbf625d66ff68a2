//! Indexer execution status.
//!
//! The service reports an indexer's health as a status document: an overall
//! status plus the result of the most recent run. [`ExecutionReport::decode`]
//! folds the two into the single [`ExecutionStatus`] the classifier works on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DescriptorError;

/// Overall execution status of an indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Unknown,
    Error,
    Running,
    Success,
    Reset,
    PartiallySucceeded,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Unknown => "unknown",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Reset => "reset",
            ExecutionStatus::PartiallySucceeded => "partiallySucceeded",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single run as reported in `lastResult.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    InProgress,
    Success,
    Reset,
    TransientFailure,
    PersistentFailure,
}

impl FromStr for RunStatus {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inProgress" => Ok(RunStatus::InProgress),
            "success" => Ok(RunStatus::Success),
            "reset" => Ok(RunStatus::Reset),
            "transientFailure" => Ok(RunStatus::TransientFailure),
            "persistentFailure" => Ok(RunStatus::PersistentFailure),
            other => Err(DescriptorError::unrecognized_status(format!(
                "run status '{}'",
                other
            ))),
        }
    }
}

/// A per-document error or warning from a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIssue {
    pub key: Option<String>,
    pub message: String,
    pub status_code: Option<u16>,
}

/// Result of the most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub items_processed: u64,
    pub failed_item_count: u64,
    pub errors: Vec<ItemIssue>,
    pub warnings: Vec<ItemIssue>,
}

/// A snapshot of an indexer's execution, fetched fresh on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub indexer_name: String,
    pub status: ExecutionStatus,
    pub last_result: Option<ExecutionResult>,
}

/// `errors[]` entry of the service's status document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemError {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub status_code: Option<u16>,
}

/// `warnings[]` entry of the service's status document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemWarning {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// `lastResult` of the service's status document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExecutionResult {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items_processed: Option<u64>,
    #[serde(default)]
    pub items_failed: Option<u64>,
    #[serde(default)]
    pub errors: Option<Vec<RawItemError>>,
    #[serde(default)]
    pub warnings: Option<Vec<RawItemWarning>>,
}

/// Body of `GET /indexers/{name}/status`.
///
/// Other attributes of the document (`executionHistory`, `limits`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerStatusDocument {
    pub status: String,
    #[serde(default)]
    pub last_result: Option<RawExecutionResult>,
}

impl IndexerStatusDocument {
    /// A status document for an indexer that has not run yet.
    pub fn idle() -> Self {
        Self {
            status: "running".to_string(),
            last_result: None,
        }
    }

    /// A running indexer whose last run ended (or is) in `run_status`.
    pub fn with_run(run_status: &str, items_processed: u64, items_failed: u64) -> Self {
        Self {
            status: "running".to_string(),
            last_result: Some(RawExecutionResult {
                status: run_status.to_string(),
                items_processed: Some(items_processed),
                items_failed: Some(items_failed),
                ..Default::default()
            }),
        }
    }

    /// Set the start time of the last run. No effect without a last run.
    pub fn started_at(mut self, start_time: DateTime<Utc>) -> Self {
        if let Some(result) = self.last_result.as_mut() {
            result.start_time = Some(start_time);
        }
        self
    }
}

impl ExecutionResult {
    fn decode(raw: RawExecutionResult) -> Result<Self, DescriptorError> {
        let status: RunStatus = raw.status.parse()?;
        let errors = raw
            .errors
            .unwrap_or_default()
            .into_iter()
            .map(|e| ItemIssue {
                key: e.key,
                message: e.error_message,
                status_code: e.status_code,
            })
            .collect();
        let warnings = raw
            .warnings
            .unwrap_or_default()
            .into_iter()
            .map(|w| ItemIssue {
                key: w.key,
                message: w.message,
                status_code: None,
            })
            .collect();

        Ok(Self {
            status,
            error_message: raw.error_message,
            start_time: raw.start_time,
            end_time: raw.end_time,
            items_processed: raw.items_processed.unwrap_or(0),
            failed_item_count: raw.items_failed.unwrap_or(0),
            errors,
            warnings,
        })
    }
}

impl ExecutionReport {
    /// Decode the service's status document.
    ///
    /// An overall status of `running` only means the indexer is enabled; the
    /// run itself is described by `lastResult`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::UnrecognizedStatus`] when either status
    /// string is outside the known vocabulary.
    pub fn decode(
        indexer_name: impl Into<String>,
        document: IndexerStatusDocument,
    ) -> Result<Self, DescriptorError> {
        let indexer_name = indexer_name.into();
        let last_result = document.last_result.map(ExecutionResult::decode).transpose()?;

        let status = match document.status.as_str() {
            "unknown" => ExecutionStatus::Unknown,
            "error" => ExecutionStatus::Error,
            "running" => match &last_result {
                None => ExecutionStatus::Unknown,
                Some(result) => match result.status {
                    RunStatus::InProgress => ExecutionStatus::Running,
                    RunStatus::Success if result.failed_item_count > 0 => {
                        ExecutionStatus::PartiallySucceeded
                    }
                    RunStatus::Success => ExecutionStatus::Success,
                    RunStatus::Reset => ExecutionStatus::Reset,
                    RunStatus::TransientFailure | RunStatus::PersistentFailure => {
                        ExecutionStatus::Error
                    }
                },
            },
            other => {
                return Err(DescriptorError::unrecognized_status(format!(
                    "indexer status '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            indexer_name,
            status,
            last_result,
        })
    }

    /// A report with no run information.
    pub fn unknown(indexer_name: impl Into<String>) -> Self {
        Self {
            indexer_name: indexer_name.into(),
            status: ExecutionStatus::Unknown,
            last_result: None,
        }
    }

    /// Items that failed in the last run, zero when there is none.
    pub fn failed_item_count(&self) -> u64 {
        self.last_result
            .as_ref()
            .map(|r| r.failed_item_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: serde_json::Value) -> Result<ExecutionReport, DescriptorError> {
        let document: IndexerStatusDocument = serde_json::from_value(json).unwrap();
        ExecutionReport::decode("demoindexer", document)
    }

    #[test]
    fn test_never_run_is_unknown() {
        let report = decode(serde_json::json!({ "status": "running", "lastResult": null })).unwrap();
        assert_eq!(report.status, ExecutionStatus::Unknown);
        assert!(report.last_result.is_none());
        assert_eq!(report.failed_item_count(), 0);
    }

    #[test]
    fn test_in_progress_run() {
        let report = ExecutionReport::decode("x", IndexerStatusDocument::with_run("inProgress", 3, 0)).unwrap();
        assert_eq!(report.status, ExecutionStatus::Running);
    }

    #[test]
    fn test_success_with_failures_is_partial() {
        let report = ExecutionReport::decode("x", IndexerStatusDocument::with_run("success", 10, 2)).unwrap();
        assert_eq!(report.status, ExecutionStatus::PartiallySucceeded);
        assert_eq!(report.failed_item_count(), 2);

        let report = ExecutionReport::decode("x", IndexerStatusDocument::with_run("success", 10, 0)).unwrap();
        assert_eq!(report.status, ExecutionStatus::Success);
    }

    #[test]
    fn test_start_time_is_kept() {
        let start = "2024-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let document = IndexerStatusDocument::with_run("success", 1, 0).started_at(start);
        let report = ExecutionReport::decode("x", document).unwrap();
        assert_eq!(report.last_result.and_then(|r| r.start_time), Some(start));

        assert!(IndexerStatusDocument::idle().started_at(start).last_result.is_none());
    }

    #[test]
    fn test_failed_runs_are_errors() {
        for raw in ["transientFailure", "persistentFailure"] {
            let report = ExecutionReport::decode("x", IndexerStatusDocument::with_run(raw, 0, 0)).unwrap();
            assert_eq!(report.status, ExecutionStatus::Error, "raw={}", raw);
        }
    }

    #[test]
    fn test_overall_status_wins() {
        let report = decode(serde_json::json!({
            "status": "error",
            "lastResult": { "status": "success", "itemsProcessed": 4, "itemsFailed": 0 }
        }))
        .unwrap();
        assert_eq!(report.status, ExecutionStatus::Error);

        let report = decode(serde_json::json!({ "status": "unknown" })).unwrap();
        assert_eq!(report.status, ExecutionStatus::Unknown);
    }

    #[test]
    fn test_reset_run() {
        let report = ExecutionReport::decode("x", IndexerStatusDocument::with_run("reset", 0, 0)).unwrap();
        assert_eq!(report.status, ExecutionStatus::Reset);
    }

    #[test]
    fn test_unknown_strings_are_rejected() {
        let err = decode(serde_json::json!({ "status": "paused" })).unwrap_err();
        assert!(matches!(err, DescriptorError::UnrecognizedStatus(_)));

        let err = ExecutionReport::decode("x", IndexerStatusDocument::with_run("cancelled", 0, 0)).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_item_issues_are_carried() {
        let report = decode(serde_json::json!({
            "status": "running",
            "lastResult": {
                "status": "success",
                "errorMessage": null,
                "startTime": "2024-05-01T10:00:00Z",
                "endTime": "2024-05-01T10:02:30Z",
                "itemsProcessed": 14,
                "itemsFailed": 1,
                "errors": [{ "key": "aHR0cHM6", "errorMessage": "Could not read document", "statusCode": 400 }],
                "warnings": [{ "key": "aHR0cHM7", "message": "Truncated extracted text" }]
            },
            "executionHistory": []
        }))
        .unwrap();

        let result = report.last_result.unwrap();
        assert_eq!(result.items_processed, 14);
        assert_eq!(result.failed_item_count, 1);
        assert_eq!(result.errors[0].message, "Could not read document");
        assert_eq!(result.errors[0].status_code, Some(400));
        assert_eq!(result.warnings[0].message, "Truncated extracted text");
        assert!(result.end_time > result.start_time);
    }
}
