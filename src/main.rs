mod cli;
mod ui;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command};
use verdict::anthropic::AnthropicClient;
use verdict::config::VerdictConfig;
use verdict::dispatcher::Dispatcher;
use verdict::intake::Intake;
use verdict::oracle::{AnthropicOracle, OpenAiOracle, OracleInvoker, OracleRouter};
use verdict::request::{EvaluationRequest, LlmType};
use verdict::store::JobStore;

/// A submit file holds either one request or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubmitFile {
    One(EvaluationRequest),
    Many(Vec<EvaluationRequest>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "verdict=debug" } else { "verdict=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = VerdictConfig::load()?;
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(retries) = cli.max_retries {
        config.set_max_retries(retries);
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let store = Arc::new(
        JobStore::open(&config.store_path)
            .with_context(|| format!("failed to open job store {}", config.store_path.display()))?,
    );

    match cli.command {
        Command::Submit { file } => submit(&config, store, &file),
        Command::Status { job_id } => {
            let intake = Intake::new(store, config.max_repetitions);
            ui::print_status(&job_id, &intake.status(&job_id)?);
            Ok(())
        }
        Command::Work { follow } => work(&config, store, follow).await,
        Command::Purge { older_than_secs } => {
            let horizon = older_than_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.retention());
            let removed = store.purge(horizon)?;
            println!("Removed {removed} finished job(s)");
            Ok(())
        }
    }
}

fn submit(config: &VerdictConfig, store: Arc<JobStore>, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let requests = match serde_json::from_str::<SubmitFile>(&contents)
        .with_context(|| format!("{} is not a valid evaluation request", file.display()))?
    {
        SubmitFile::One(request) => vec![request],
        SubmitFile::Many(requests) => requests,
    };

    let intake = Intake::new(store, config.max_repetitions);
    for request in requests {
        let submission = intake.enqueue(request)?;
        ui::print_submission(&submission);
    }
    Ok(())
}

fn build_router(config: &VerdictConfig) -> Result<OracleRouter> {
    let mut router = OracleRouter::new();
    if !config.api_key.is_empty() {
        let client = Arc::new(AnthropicClient::new(config.api_key.clone())?);
        router = router.with(
            LlmType::Claude,
            Arc::new(AnthropicOracle::new(client, config.model.clone(), config.max_tokens)),
        );
    }
    if !config.openai_api_key.is_empty() {
        router = router.with(
            LlmType::Gpt,
            Arc::new(OpenAiOracle::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            )?),
        );
    }
    if router.is_empty() {
        bail!(
            "No API key configured. Set ANTHROPIC_API_KEY or OPENAI_API_KEY, or api_key / openai_api_key in verdict.toml."
        );
    }
    Ok(router)
}

async fn work(config: &VerdictConfig, store: Arc<JobStore>, follow: bool) -> Result<()> {
    let router = build_router(config)?;
    info!(judges = ?router.providers(), "judges configured");
    let oracle = Arc::new(router);

    // Only the worker may decide that an ACTIVE job has lost its owner.
    store.recover_interrupted()?;

    let invoker = Arc::new(OracleInvoker::new(oracle, config.retry_policy()));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        invoker,
        config.dispatcher_config(),
    ));

    if follow {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested, finishing jobs in progress");
                let _ = shutdown_tx.send(true);
            }
        });
        dispatcher.run(shutdown_rx).await;
        return Ok(());
    }

    let queued = store.counts()?.queued;
    if queued == 0 {
        warn!("no queued jobs");
        return Ok(());
    }
    let progress = ui::DrainProgress::start(queued, config.workers.max(1));
    let processed = dispatcher.drain().await;
    progress.finish(processed, &store.counts()?);
    Ok(())
}
