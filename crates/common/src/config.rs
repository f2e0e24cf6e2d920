//! Layered configuration for the keyspace server.
//!
//! Configuration is assembled from, in increasing precedence: built-in
//! defaults, an optional TOML file, then CLI flags. This mirrors the
//! teacher's `AppConfig::load` precedence chain (`config::Config::builder()`
//! layering a `config::File` source), trimmed to the handful of knobs the
//! server actually exposes (§10.2 of the specification).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Server configuration: capacity, snapshot cadence, and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// `max_cache_size`: the key-count capacity bound enforced by the APC.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Path to the snapshot file, loaded on startup and written on shutdown
    /// and periodically.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Seconds between background snapshot dumps.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Worker pool size. Defaults to hardware concurrency (fallback 4).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// `pretty` or `json` log formatting.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// `tracing`/`RUST_LOG`-style log level filter.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    6379
}

fn default_capacity() -> usize {
    10_000
}

fn default_snapshot_path() -> String {
    "dump.my_rdb".to_string()
}

fn default_snapshot_interval_secs() -> u64 {
    300
}

fn default_workers() -> usize {
    num_cpus::get().max(4)
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            capacity: default_capacity(),
            snapshot_path: default_snapshot_path(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            workers: default_workers(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load defaults, overlay an optional TOML file, then apply the given
    /// overrides (already resolved from CLI flags by the caller). `None`
    /// overrides leave the file/default value untouched.
    ///
    /// Layering follows the teacher's `AppConfig::load`: a `config::Config`
    /// builder with the optional file added as a non-required source, then
    /// deserialized straight into `ServerConfig` (every field's `#[serde(default
    /// = ...)]` supplies the built-in default for anything the file omits,
    /// or for a missing file entirely). CLI overrides are applied as a
    /// post-build struct overlay, since they arrive pre-parsed from `clap`
    /// rather than as a raw source `config` can merge.
    pub fn load(config_path: Option<&str>, overrides: ConfigOverrides) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let built = builder
            .build()
            .with_context(|| format!("building layered configuration (file: {config_path:?})"))?;
        let mut config: ServerConfig = built
            .try_deserialize()
            .context("deserializing layered configuration")?;

        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("port must be greater than 0");
        }
        if self.capacity == 0 {
            bail!("capacity must be greater than 0");
        }
        if self.workers == 0 {
            bail!("workers must be greater than 0");
        }
        if self.snapshot_path.is_empty() {
            bail!("snapshot_path must not be empty");
        }
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            bail!(
                "invalid log format '{}'. Must be one of: {}",
                self.log_format,
                valid_formats.join(", ")
            );
        }
        Ok(())
    }
}

/// CLI-sourced overrides, applied over the file/default configuration.
/// Every field is optional: a flag the user never passed leaves the
/// underlying value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub capacity: Option<usize>,
    pub snapshot_path: Option<String>,
    pub snapshot_interval_secs: Option<u64>,
    pub workers: Option<usize>,
    pub log_format: Option<String>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(path) = self.snapshot_path {
            config.snapshot_path = path;
        }
        if let Some(secs) = self.snapshot_interval_secs {
            config.snapshot_interval_secs = secs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 6379);
        assert_eq!(config.snapshot_interval_secs, 300);
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = ServerConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = ServerConfig::default();
        config.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut config = ServerConfig::default();
        config.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let overrides = ConfigOverrides {
            port: Some(7000),
            capacity: Some(42),
            ..Default::default()
        };
        let config = ServerConfig::load(None, overrides).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.capacity, 42);
        assert_eq!(config.snapshot_path, "dump.my_rdb");
    }
}
