//! Orchestrator module for a pipeline run.
//!
//! Coordinates the synchronizer, the indexer run and the status poller.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::PipelineAction;
use crate::errors::PipelineError;
use crate::plan::PipelinePlan;
use skillset_sync_repository::{
    OutcomeCategory, PollEnd, PollOutcome, PollerConfig, ResourceSynchronizer,
    SearchServiceProvider, StatusPoller, SyncReport, SyncResult, SynchronizerConfig,
};
use skillset_sync_shared::{ExecutionResult, ResourceKind};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sync the pipeline or tear it down.
    pub action: PipelineAction,
    /// Start an indexer run when the sync did not create the indexer.
    pub run_indexer: bool,
    /// Budget for the synchronization steps.
    pub sync_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            action: PipelineAction::Sync,
            run_indexer: true,
            sync_timeout: Duration::from_secs(300),
        }
    }
}

/// What a run did.
#[derive(Debug, Clone)]
pub enum RunSummary {
    /// The pipeline was synchronized (and for a reset, the indexer reset)
    /// and the indexer followed.
    Synced {
        report: SyncReport,
        /// Whether this run asked the service to start the indexer.
        started_run: bool,
        outcome: PollOutcome,
    },
    /// The pipeline was deleted.
    TornDown { removed: usize },
}

/// Orchestrator that coordinates a pipeline run.
pub struct Orchestrator {
    provider: Arc<dyn SearchServiceProvider>,
    synchronizer: ResourceSynchronizer,
    poller: StatusPoller,
    plan: PipelinePlan,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator with default configuration.
    pub fn new(provider: Arc<dyn SearchServiceProvider>, plan: PipelinePlan) -> Self {
        let synchronizer_config =
            SynchronizerConfig::default().with_base_document(plan.base_document());
        Self::with_config(
            provider,
            plan,
            synchronizer_config,
            PollerConfig::default(),
            OrchestratorConfig::default(),
        )
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        provider: Arc<dyn SearchServiceProvider>,
        plan: PipelinePlan,
        synchronizer_config: SynchronizerConfig,
        poller_config: PollerConfig,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            synchronizer: ResourceSynchronizer::with_config(provider.clone(), synchronizer_config),
            poller: StatusPoller::new(provider.clone(), poller_config),
            provider,
            plan,
            config,
        }
    }

    /// The pipeline this orchestrator manages.
    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    /// Run the configured action until it finishes or Ctrl-C is received.
    #[instrument(skip(self), fields(action = ?self.config.action))]
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let cancel = CancellationToken::new();

        let signal_cancel = cancel.clone();
        let signal_handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    signal_cancel.cancel();
                }
                _ = signal_cancel.cancelled() => {}
            }
        });

        let result = self.run_with_cancel(&cancel).await;

        // Release the signal task.
        cancel.cancel();
        let _ = signal_handle.await;

        result
    }

    /// Run the configured action, stopping early when `cancel` fires.
    ///
    /// Cancellation between synchronization steps returns
    /// [`SyncError::Cancelled`](skillset_sync_repository::SyncError::Cancelled)
    /// with the steps already applied. Cancellation while polling ends the
    /// wait with the last report seen.
    pub async fn run_with_cancel(&self, cancel: &CancellationToken) -> Result<RunSummary, PipelineError> {
        match self.config.action {
            PipelineAction::Sync => self.sync(cancel).await,
            PipelineAction::Reset => self.reset(cancel).await,
            PipelineAction::Teardown => self.teardown().await,
        }
    }

    async fn sync(&self, cancel: &CancellationToken) -> Result<RunSummary, PipelineError> {
        info!(
            data_source = %self.plan.data_source.name,
            skillset = %self.plan.skillset.name,
            index = %self.plan.index.name,
            indexer = %self.plan.indexer.name,
            "Synchronizing pipeline"
        );

        let report = self.synchronize(cancel).await?;
        let indexer = self.plan.indexer.name.as_str();

        let created = report.result_for(ResourceKind::Indexer, indexer) == Some(SyncResult::Created);
        // A freshly created indexer is started by the service itself.
        let (started_run, previous) = if created || !self.config.run_indexer {
            (false, None)
        } else {
            self.request_run(indexer).await?
        };

        let outcome = self.follow_run(indexer, previous.as_ref(), cancel).await?;
        Ok(RunSummary::Synced {
            report,
            started_run,
            outcome,
        })
    }

    /// Sync, then clear the indexer's change tracking and run it over every document.
    async fn reset(&self, cancel: &CancellationToken) -> Result<RunSummary, PipelineError> {
        let report = self.synchronize(cancel).await?;
        let indexer = self.plan.indexer.name.as_str();

        self.provider.reset_indexer(indexer).await?;
        info!(indexer = %indexer, "Indexer reset");

        let (started_run, previous) = self.request_run(indexer).await?;
        let outcome = self.follow_run(indexer, previous.as_ref(), cancel).await?;
        Ok(RunSummary::Synced {
            report,
            started_run,
            outcome,
        })
    }

    /// Poll the indexer until its run ends and turn a failed run into an error.
    ///
    /// Reports of the run that ended with `previous` are not taken for the
    /// outcome of the run being followed.
    async fn follow_run(
        &self,
        indexer: &str,
        previous: Option<&ExecutionResult>,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, PipelineError> {
        let outcome = self.poller.wait_for_run_after(indexer, previous, cancel).await?;
        let failed_items = outcome.report.failed_item_count();

        match (outcome.end, outcome.category) {
            (_, OutcomeCategory::Failed) => {
                let message = outcome
                    .report
                    .last_result
                    .as_ref()
                    .and_then(|r| r.error_message.clone())
                    .unwrap_or_else(|| outcome.hint.to_string());
                error!(indexer = %indexer, error = %message, "Indexer run failed");
                return Err(PipelineError::indexer_failed(indexer, message));
            }
            (PollEnd::Completed, OutcomeCategory::Degraded) => {
                warn!(indexer = %indexer, failed_items, "Indexer run completed with failed items");
            }
            (PollEnd::Completed, _) => {
                info!(indexer = %indexer, polls = outcome.polls, "Indexer run completed");
            }
            (PollEnd::TimedOut, category) => {
                warn!(indexer = %indexer, outcome = %category, "Indexer still not finished, giving up");
            }
            (PollEnd::Cancelled, category) => {
                warn!(indexer = %indexer, outcome = %category, "Stopped following the indexer");
            }
        }
        Ok(outcome)
    }

    /// Synchronize every descriptor within the sync budget.
    async fn synchronize(&self, cancel: &CancellationToken) -> Result<SyncReport, PipelineError> {
        let sync_cancel = cancel.child_token();

        let budget = self.config.sync_timeout;
        let timer_cancel = sync_cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = sleep(budget) => {
                    warn!(sync_timeout_secs = budget.as_secs(), "Synchronization budget exhausted");
                    timer_cancel.cancel();
                }
                _ = timer_cancel.cancelled() => {}
            }
        });

        let result = self
            .synchronizer
            .synchronize_all(&self.plan.descriptors(), &sync_cancel)
            .await;

        timer.abort();
        Ok(result?)
    }

    /// Ask the service to run the indexer.
    ///
    /// Returns whether the run was requested, and the last result reported
    /// before the request so the poller can tell the new run from the old one.
    async fn request_run(
        &self,
        indexer: &str,
    ) -> Result<(bool, Option<ExecutionResult>), PipelineError> {
        let previous = match self.provider.get_execution_report(indexer).await {
            Ok(report) => report.last_result,
            Err(e) if e.is_transient() => {
                warn!(indexer = %indexer, error = %e, "Could not read the indexer status before the run");
                None
            }
            Err(e) => return Err(e.into()),
        };

        match self.provider.run_indexer(indexer).await {
            Ok(()) => {
                info!(indexer = %indexer, "Indexer run requested");
                Ok((true, previous))
            }
            // Usually a run already in progress; follow that one.
            Err(e) if e.is_transient() => {
                warn!(indexer = %indexer, error = %e, "Could not start the indexer, following its current run");
                Ok((false, None))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn teardown(&self) -> Result<RunSummary, PipelineError> {
        info!(indexer = %self.plan.indexer.name, "Tearing down pipeline");
        let removed = self.synchronizer.teardown(&self.plan.descriptors()).await?;
        info!(removed, "Pipeline removed");
        Ok(RunSummary::TornDown { removed })
    }
}
