//! Slidebench - Unified CLI
//!
//! Serves the benchmark API or executes single runs from the terminal.

#![warn(missing_docs)]

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use slidebench::{
    AppState, BenchConfig, BroadcastSink, LlmGateway, NullSink, Orchestrator, RunConfig,
    RunRequest, RunSupervisor, open_store,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,slidebench=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => run_server(&config, host, port).await,
        Command::Run {
            config,
            model,
            size,
            max_moves,
            scramble_depth,
            delay_ms,
            seed,
        } => {
            let request = RunRequest {
                model_id: model,
                size: Some(size),
                max_moves: Some(max_moves),
                scramble_depth: Some(scramble_depth),
            };
            run_once(&config, request, Duration::from_millis(delay_ms), seed).await
        }
        Command::Stats { config } => print_stats(&config),
    }
}

/// Run the HTTP API
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_server(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = BenchConfig::load(config_path)?;
    config.override_server(host, port);

    let store = open_store(config.storage())?;
    let gateway = LlmGateway::from_env(config.gateway())?;
    let events = BroadcastSink::default();
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        Arc::new(gateway),
        Arc::new(events.clone()),
    ));

    let supervisor = RunSupervisor::new(orchestrator, config.server().step_delay());
    let state = AppState::new(
        supervisor,
        events,
        config.gateway().default_model().clone(),
    );

    info!(
        host = %config.server().host(),
        port = config.server().port(),
        "Starting slidebench server"
    );
    slidebench::serve(state, config.server().host(), *config.server().port())
        .await
        .context("Server stopped")?;
    Ok(())
}

/// Execute a single run and print the final view
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_once(
    config_path: &Path,
    request: RunRequest,
    delay: Duration,
    seed: Option<u64>,
) -> Result<()> {
    let config = BenchConfig::load(config_path)?;
    let store = open_store(config.storage())?;
    let gateway = Arc::new(LlmGateway::from_env(config.gateway())?);
    let sink = Arc::new(NullSink);

    let orchestrator = match seed {
        Some(seed) => Orchestrator::with_seed(store, gateway, sink, seed),
        None => Orchestrator::new(store, gateway, sink),
    };

    let run_config = RunConfig::from_request(&request, config.gateway().default_model());
    let view = orchestrator.initialize_run(&run_config)?;
    let run_id = *view.run.id();
    info!(%run_id, "Initial board:\n{}", view.game.initial_board().render());

    let finished = orchestrator
        .run_to_completion(run_id, delay)
        .await?
        .context("Run disappeared from the store")?;

    info!(
        status = %finished.run.status(),
        failure = ?finished.run.failure(),
        moves = finished.game.move_count(),
        "Final board:\n{}",
        finished.game.current_board().render()
    );
    println!("{}", serde_json::to_string_pretty(&finished)?);
    Ok(())
}

/// Print aggregate statistics
#[instrument(skip_all, fields(config_path = %config_path.display()))]
fn print_stats(config_path: &Path) -> Result<()> {
    let config = BenchConfig::load(config_path)?;
    let store = open_store(config.storage())?;
    let stats = store.get_stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
