//! Skillset Sync Main Entry Point
//!
//! Synchronizes the demo enrichment pipeline onto the search service and
//! follows the indexer until its run finishes.

use dotenv::dotenv;
use skillset_sync::{Dependencies, RunSummary, SetupError, Settings};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("skillset_sync=info,skillset_sync_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "skillset-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "skillset-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), SetupError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting skillset sync");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };

    let deps = match Dependencies::new(&settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.orchestrator.run().await {
        Ok(RunSummary::Synced {
            report,
            started_run,
            outcome,
        }) => {
            info!(
                created = report.created(),
                updated = report.updated(),
                unchanged = report.unchanged(),
                started_run,
                outcome = %outcome.category,
                items_processed = outcome.report.last_result.as_ref().map(|r| r.items_processed).unwrap_or(0),
                failed_items = outcome.report.failed_item_count(),
                "Skillset sync completed"
            );
            Ok(())
        }
        Ok(RunSummary::TornDown { removed }) => {
            info!(removed, "Skillset teardown completed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Skillset sync failed");
            Err(e.into())
        }
    }
}
