// # cfsyncd - cfnat-sync Daemon
//
// Thin integration layer: all reconciliation logic lives in
// cfsync-core. The daemon is responsible for:
//
// 1. Loading and validating the YAML configuration
// 2. Initializing tracing and the runtime
// 3. Wiring the Cloudflare store, cache log and engine together
// 4. Spawning the discovery subprocess and forwarding its line stream
// 5. Forwarding termination signals to the subprocess on shutdown
//
// ## Configuration
//
// A single YAML file, by default `config.yaml` in the working
// directory, overridable as the first command-line argument:
//
// ```yaml
// cloudflare:
//   email: ops@example.com
//   api_key: "..."
//   zone_id: "..."
//   record_names:
//     - fast.example.com
// sync_count: 3
// colo: HKG
// ```
//
// Log verbosity comes from `CFSYNC_LOG_LEVEL` (trace|debug|info|warn|
// error, default info).

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use cfsync_core::traits::DiscoverySource;
use cfsync_core::{CacheLog, Config, EngineEvent, SyncEngine};
use cfsync_provider_cloudflare::CloudflareStore;
use cfsync_source_cfnat::CfnatSource;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());

    // Load and validate configuration before anything else; cache and
    // reconciliation activity must not begin on a broken config.
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let log_level = match env::var("CFSYNC_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("starting cfsyncd");
    info!(
        "managing {} record name(s) in zone {}",
        config.cloudflare.record_names.len(),
        config.cloudflare.zone_id
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("daemon error: {}", e);
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    })
    .into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let store = Arc::new(CloudflareStore::new(
        config.cloudflare.email.clone(),
        config.cloudflare.api_key.clone(),
        config.cloudflare.zone_id.clone(),
    )?);

    let (engine, events) = SyncEngine::new(
        store,
        CacheLog::new(&config.log_file),
        config.cloudflare.record_names.clone(),
        config.sync_count,
    );

    let replayed = engine.seed_from_log().await?;
    info!(
        "seeded cache from {} ({} entr(ies) replayed)",
        config.log_file, replayed
    );

    // Engine events are collected only for logging.
    tokio::spawn(log_engine_events(events));

    let mut source = CfnatSource::spawn(&config.program, &config.discovery.to_args())?;
    let lines = source.lines();

    tokio::select! {
        result = engine.run(lines) => {
            // Discovery process exited on its own.
            result?;
            warn!("discovery process exited, shutting down");
        }
        signal_name = wait_for_shutdown() => {
            info!("received {}, shutting down", signal_name?);
        }
    }

    // Forward termination; in-flight reconciliation tasks are
    // abandoned, best effort only.
    source.shutdown().await?;
    Ok(())
}

/// Log engine events as human-readable status lines
async fn log_engine_events(mut events: tokio::sync::mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::AddressAccepted { address, family } => {
                info!("cache accepted {} address {}", family, address);
            }
            EngineEvent::SyncDispatched {
                record_name,
                address,
            } => {
                info!("[{}] reconciliation dispatched for {}", record_name, address);
            }
            EngineEvent::CacheSaveFailed { error } => {
                warn!("cache log save failed: {}", error);
            }
            EngineEvent::Started { records_count } => {
                info!("engine started, {} record name(s)", records_count);
            }
            EngineEvent::Stopped { reason } => {
                info!("engine stopped: {}", reason);
            }
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for ctrl-c (fallback for non-Unix platforms)
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to wait for ctrl-c: {}", e))?;
    Ok("ctrl-c")
}
