//! Ambient stack shared by every crate in the keyspace workspace: layered
//! configuration and logging setup.

pub mod config;
pub mod telemetry;

pub use config::{ConfigOverrides, ServerConfig};
pub use telemetry::init_tracing;

/// Common error type used throughout the crate.
pub type Result<T> = std::result::Result<T, anyhow::Error>;
