//! Indexer status polling.

use std::sync::Arc;
use std::time::Duration;

use skillset_sync_shared::{ExecutionReport, ExecutionResult};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::classifier::{classify, OutcomeCategory};
use crate::errors::SyncError;
use crate::interfaces::SearchServiceProvider;

/// Hint logged while the service still reports the run before the requested one.
const PREVIOUS_RUN_HINT: &str = "requested run not started yet; still reporting the previous run";

/// Configuration for the StatusPoller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between two status requests.
    pub interval: Duration,
    /// How long to wait for a terminal outcome.
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Why polling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEnd {
    /// The outcome became terminal.
    Completed,
    /// The timeout elapsed first.
    TimedOut,
    /// The cancellation token fired.
    Cancelled,
}

/// The last report seen and how it was classified.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub report: ExecutionReport,
    pub category: OutcomeCategory,
    pub hint: &'static str,
    pub end: PollEnd,
    /// Number of status requests made.
    pub polls: u32,
}

/// Polls an indexer until its execution outcome is terminal.
pub struct StatusPoller {
    provider: Arc<dyn SearchServiceProvider>,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(provider: Arc<dyn SearchServiceProvider>, config: PollerConfig) -> Self {
        Self { provider, config }
    }

    /// Poll `indexer_name` every `interval` until its outcome is terminal.
    ///
    /// The first request is made immediately. Transient errors are logged and
    /// polling goes on; any other error is returned. Every classified report
    /// is logged with its hint.
    ///
    /// # Returns
    ///
    /// * `Ok(PollOutcome)` - The last report, with [`PollEnd`] telling whether it
    ///   is terminal, timed out or was cancelled
    /// * `Err(SyncError)` - A non-transient provider error
    pub async fn wait_for_completion(
        &self,
        indexer_name: &str,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, SyncError> {
        self.wait_for_run_after(indexer_name, None, cancel).await
    }

    /// Like [`wait_for_completion`](Self::wait_for_completion), for a run
    /// requested after `previous` was reported.
    ///
    /// The service keeps reporting the previous run for a moment after a new
    /// one is requested. A terminal report that started no later than
    /// `previous` (or, without start times, equals it) counts as in progress.
    #[instrument(skip(self, previous, cancel), fields(interval_secs = self.config.interval.as_secs(), timeout_secs = self.config.timeout.as_secs()))]
    pub async fn wait_for_run_after(
        &self,
        indexer_name: &str,
        previous: Option<&ExecutionResult>,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, SyncError> {
        // No deadline when the timeout is too large to represent.
        let deadline = Instant::now().checked_add(self.config.timeout);
        let mut last = Self::judge(ExecutionReport::unknown(indexer_name), previous);
        let mut polls = 0;

        loop {
            polls += 1;
            match self.provider.get_execution_report(indexer_name).await {
                Ok(report) => {
                    let (report, category, hint) = Self::judge(report, previous);
                    info!(
                        status = %report.status,
                        outcome = %category,
                        items_processed = report.last_result.as_ref().map(|r| r.items_processed).unwrap_or(0),
                        failed_items = report.failed_item_count(),
                        "{}",
                        hint
                    );
                    last = (report, category, hint);
                    if category.is_terminal() {
                        return Ok(Self::outcome(last, PollEnd::Completed, polls));
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Status request failed, will retry");
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                warn!(polls, "Gave up waiting for the indexer to finish");
                return Ok(Self::outcome(last, PollEnd::TimedOut, polls));
            }

            let wake = match (now.checked_add(self.config.interval), deadline) {
                (Some(next), Some(d)) => Some(next.min(d)),
                (next, None) => next,
                (None, d) => d,
            };
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(polls, "Status polling cancelled");
                    return Ok(Self::outcome(last, PollEnd::Cancelled, polls));
                }
                _ = async {
                    match wake {
                        Some(wake) => sleep_until(wake).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {}
            }
        }
    }

    /// Classify a report, holding back a terminal outcome that belongs to the previous run.
    fn judge(
        report: ExecutionReport,
        previous: Option<&ExecutionResult>,
    ) -> (ExecutionReport, OutcomeCategory, &'static str) {
        let (category, hint) = classify(&report);
        if category.is_terminal() && Self::is_previous_run(&report, previous) {
            return (report, OutcomeCategory::InProgress, PREVIOUS_RUN_HINT);
        }
        (report, category, hint)
    }

    fn is_previous_run(report: &ExecutionReport, previous: Option<&ExecutionResult>) -> bool {
        match (previous, report.last_result.as_ref()) {
            (Some(previous), Some(current)) => match (previous.start_time, current.start_time) {
                (Some(before), Some(now)) => now <= before,
                _ => current == previous,
            },
            _ => false,
        }
    }

    fn outcome(
        (report, category, hint): (ExecutionReport, OutcomeCategory, &'static str),
        end: PollEnd,
        polls: u32,
    ) -> PollOutcome {
        PollOutcome {
            report,
            category,
            hint,
            end,
            polls,
        }
    }
}
