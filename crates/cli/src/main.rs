//! The `keyspace-server` binary: wires configuration, logging, the
//! datastore, and the connection server together, and handles startup
//! restore / shutdown snapshot.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use keyspace_common::config::{ConfigOverrides, ServerConfig};
use keyspace_common::telemetry::init_tracing;
use keyspace_server::{snapshot_task, ConnectionServer};
use keyspace_store::Datastore;

/// An in-memory key-value server with a Redis-compatible wire protocol and
/// an adaptive predictive eviction cache.
#[derive(Parser, Debug)]
#[command(name = "keyspace-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TCP port to listen on.
    #[arg(default_value_t = 6379)]
    port: u16,

    /// Maximum number of live keys before the cache evicts (`max_cache_size`).
    #[arg(long)]
    capacity: Option<usize>,

    /// Path to the snapshot file, loaded on startup and written on shutdown.
    #[arg(long)]
    snapshot_path: Option<String>,

    /// Seconds between background snapshot dumps.
    #[arg(long)]
    snapshot_interval_secs: Option<u64>,

    /// Worker pool size. Defaults to hardware concurrency (fallback 4).
    #[arg(long)]
    workers: Option<usize>,

    /// `pretty` or `json` log formatting.
    #[arg(long)]
    log_format: Option<String>,

    /// `tracing`/`RUST_LOG`-style log level filter.
    #[arg(long)]
    log_level: Option<String>,

    /// Optional TOML configuration file; the flags above take precedence
    /// over values it sets.
    #[arg(long)]
    config: Option<String>,
}

/// Exit code for a signal-triggered shutdown, following the shell convention
/// of `128 + signum`. `ctrlc`'s handler doesn't report which signal fired,
/// and the original `signalHandler` only ever registered `SIGINT` (2), so
/// this is the one code used regardless of which of `SIGINT`/`SIGTERM`/
/// `SIGHUP` the `termination` feature caught.
const SIGNAL_SHUTDOWN_EXIT_CODE: i32 = 128 + 2;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        port: Some(cli.port),
        capacity: cli.capacity,
        snapshot_path: cli.snapshot_path,
        snapshot_interval_secs: cli.snapshot_interval_secs,
        workers: cli.workers,
        log_format: cli.log_format,
        log_level: cli.log_level,
    };
    let config =
        ServerConfig::load(cli.config.as_deref(), overrides).context("loading configuration")?;

    init_tracing(config.log_format == "json", &config.log_level)
        .context("initializing logging")?;

    let store = Arc::new(Datastore::new(config.capacity));
    let snapshot_path = PathBuf::from(&config.snapshot_path);

    if snapshot_path.exists() {
        match store.load(&snapshot_path) {
            Ok(()) => tracing::info!(
                path = %snapshot_path.display(),
                keys = store.len(),
                "restored snapshot"
            ),
            Err(err) => tracing::warn!(
                path = %snapshot_path.display(),
                error = %err,
                "failed to restore snapshot, starting empty"
            ),
        }
    }

    let server = Arc::new(ConnectionServer::new(
        Arc::clone(&store),
        config.workers,
    ));
    let running = server.running_flag();
    let signaled = Arc::new(AtomicBool::new(false));

    {
        let running = Arc::clone(&running);
        let signaled = Arc::clone(&signaled);
        ctrlc::set_handler(move || {
            tracing::info!("shutdown signal received");
            signaled.store(true, Ordering::SeqCst);
            running.store(false, Ordering::SeqCst);
        })
        .context("installing signal handler")?;
    }

    let snapshot_handle = snapshot_task::spawn(
        Arc::clone(&store),
        snapshot_path.clone(),
        Duration::from_secs(config.snapshot_interval_secs),
        Arc::clone(&running),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    server.serve(addr).context("running connection server")?;

    // `serve` only returns once `running` has been cleared, so the
    // background snapshot thread is already on its way out.
    running.store(false, Ordering::SeqCst);
    snapshot_handle
        .join()
        .expect("snapshot thread panicked");

    match store.dump(&snapshot_path) {
        Ok(()) => tracing::info!(path = %snapshot_path.display(), "final snapshot written"),
        Err(err) => {
            tracing::error!(path = %snapshot_path.display(), error = %err, "final snapshot failed")
        }
    }

    if signaled.load(Ordering::SeqCst) {
        std::process::exit(SIGNAL_SHUTDOWN_EXIT_CODE);
    }

    Ok(())
}
