//! Slice Engine Binary
//!
//! Replays JSON-lines market data files through the slice synchronizer and
//! logs every slice.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin slice-engine -- config.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `SLICE_ENGINE_CONFIG`: Config path when no argument is given (default: config.yaml)
//! - `RUST_LOG`: Log filter (overrides `observability.logging.level`)

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use slice_engine::clock::{ManualTimeProvider, RealTimeProvider, TimeProvider};
use slice_engine::config::{ClockMode, Config, ReplayInput, load_config};
use slice_engine::market::Timestamp;
use slice_engine::slice::Slice;
use slice_engine::sync::{DriverExit, JsonLinesFeed, SliceSynchronizer, SyncDriver, SyncEvent};
use slice_engine::telemetry::init_tracing;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SLICE_ENGINE_CONFIG").ok());
    let config = load_config(config_path.as_deref()).context("loading configuration")?;

    init_tracing(&config.observability.logging).map_err(|e| anyhow!("initializing tracing: {e}"))?;

    tracing::info!(
        clock = ?config.clock.mode,
        inputs = config.replay.inputs.len(),
        "Starting Slice Engine replay"
    );

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    match config.clock.mode {
        ClockMode::Manual => replay_manual(&config, &shutdown_token)?,
        ClockMode::Real => replay_paced(&config, shutdown_token).await?,
    }

    tracing::info!("Slice Engine stopped");
    Ok(())
}

/// Replay against a fixed frontier: everything up to it is emitted, then stop.
fn replay_manual(config: &Config, shutdown_token: &CancellationToken) -> anyhow::Result<()> {
    let start = config
        .clock
        .start_time()
        .context("parsing clock.start")?
        .unwrap_or(Timestamp::MAX);
    let provider: Arc<dyn TimeProvider> = Arc::new(ManualTimeProvider::new(start));
    let mut synchronizer = SliceSynchronizer::new(provider);
    subscribe_inputs(&mut synchronizer, config)?;

    while !shutdown_token.is_cancelled() {
        match synchronizer.step() {
            Some(SyncEvent::Slice(slice)) => log_slice(&slice),
            Some(SyncEvent::StreamFaulted { .. }) => {}
            Some(SyncEvent::Idle { frontier, next_due }) => {
                tracing::info!(
                    frontier = %frontier,
                    next_due = ?next_due,
                    "Frontier reached; remaining data is beyond it"
                );
                break;
            }
            None => break,
        }
    }

    tracing::info!(slices = synchronizer.slices_emitted(), "Manual replay complete");
    Ok(())
}

/// Replay paced by the system clock on the async driver.
///
/// Files are subscribed directly rather than through producer tasks, so no
/// file is ever observed as stalled and the slice sequence is deterministic.
async fn replay_paced(config: &Config, shutdown_token: CancellationToken) -> anyhow::Result<()> {
    let provider: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider::new());
    let mut synchronizer = SliceSynchronizer::new(provider);
    subscribe_inputs(&mut synchronizer, config)?;

    let driver = SyncDriver::new(
        synchronizer,
        config.synchronizer.idle_poll_interval(),
        shutdown_token,
    );
    let (handle, mut events) = driver.spawn(config.synchronizer.event_channel_capacity);

    while let Some(event) = events.recv().await {
        if let SyncEvent::Slice(slice) = event {
            log_slice(&slice);
        }
    }

    let exit = handle.await.context("sync driver task failed")?;
    if exit == DriverExit::Cancelled {
        tracing::info!("Replay cancelled");
    }
    Ok(())
}

fn subscribe_inputs(synchronizer: &mut SliceSynchronizer, config: &Config) -> anyhow::Result<()> {
    for input in &config.replay.inputs {
        let id = input.subscription_id();
        let feed = open_feed(input)?;
        anyhow::ensure!(
            synchronizer.subscribe(id.clone(), feed),
            "replay input {} duplicates subscription {id}",
            input.path
        );
    }
    Ok(())
}

fn open_feed(input: &ReplayInput) -> anyhow::Result<JsonLinesFeed<BufReader<File>>> {
    let file = File::open(&input.path).with_context(|| format!("opening {}", input.path))?;
    Ok(JsonLinesFeed::new(BufReader::new(file)))
}

fn log_slice(slice: &Slice) {
    tracing::info!(
        time = %slice.time(),
        symbols = slice.len(),
        data_points = slice.data_count(),
        "Slice"
    );
}

/// Load environment variables from `.env`, searching parent directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel `token`.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    token.cancel();
}
