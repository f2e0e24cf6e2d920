//! The background snapshot thread.
//!
//! The original server detaches a thread that sleeps 300 seconds and dumps
//! forever, with no way to stop it short of killing the process. This
//! implementation keeps the cadence but wakes in short ticks so it can
//! notice a shutdown request and return promptly, letting `main` join it
//! instead of leaking the thread.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use keyspace_store::Datastore;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn the periodic snapshot thread. It wakes every second to check
/// `running`, and performs a dump once `interval` has elapsed since its
/// last one. Returns the join handle so the caller can wait for it to exit
/// after clearing `running`.
pub fn spawn(
    store: Arc<Datastore>,
    path: PathBuf,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("keyspace-snapshot".into())
        .spawn(move || run(store, path, interval, running))
        .expect("failed to spawn snapshot thread")
}

fn run(store: Arc<Datastore>, path: PathBuf, interval: Duration, running: Arc<AtomicBool>) {
    let mut elapsed = Duration::ZERO;
    while running.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);
        elapsed += POLL_INTERVAL;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if elapsed >= interval {
            elapsed = Duration::ZERO;
            match store.dump(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "periodic snapshot written"),
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "periodic snapshot failed"),
            }
        }
    }
}
