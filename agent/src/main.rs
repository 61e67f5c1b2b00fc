//! `daybook-format` entry point.
//!
//! Reconciles today's Timeline (and yesterday's, when present) in the Roam
//! graph named by `ROAM_GRAPH_NAME`. Takes no arguments; all settings come
//! from the environment. Logs go to stderr, filtered by `RUST_LOG`.
//!
//! Exit status is 0 when the run completed, including runs where individual
//! batches failed, and 1 when the run could not complete.

use std::process::ExitCode;

use chrono::Utc;
use daybook_engine::{
    AnthropicClient, BatchOutcome, EngineConfig, EngineError, RunReport, TimelineEngine,
};
use daybook_store::HttpGraphStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("daybook-format v{} starting", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(report) => {
            log_report(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(category = err.category().as_str(), "{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunReport, EngineError> {
    let config = EngineConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let store = HttpGraphStore::new(config.store_settings())?;
    let model = AnthropicClient::new(&config.anthropic_base_url, config.anthropic_api_key.clone())?;
    TimelineEngine::new(config, store, model)
        .run(Utc::now())
        .await
}

fn log_report(report: &RunReport) {
    for batch in &report.apply.batches {
        match &batch.outcome {
            BatchOutcome::Applied => tracing::info!(
                day = %batch.day,
                verb = %batch.verb,
                count = batch.count,
                "applied"
            ),
            BatchOutcome::Failed(reason) => tracing::warn!(
                day = %batch.day,
                verb = %batch.verb,
                count = batch.count,
                reason = %reason,
                "failed"
            ),
        }
    }
    for (day, count) in &report.apply.skipped_days {
        tracing::warn!(day = %day, count, "skipped, no Timeline container");
    }
    tracing::info!(
        date = %report.today,
        planned = report.plan.len(),
        applied = report.apply.applied_actions(),
        dropped = report.dropped,
        "done"
    );
}
