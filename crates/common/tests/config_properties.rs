//! Property tests for config override precedence: any `Some` override value
//! always wins over the default, and a `None` override never disturbs it.

use keyspace_common::{ConfigOverrides, ServerConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn port_override_always_wins_when_present(port in 1u16..=u16::MAX) {
        let overrides = ConfigOverrides {
            port: Some(port),
            ..Default::default()
        };
        let config = ServerConfig::load(None, overrides).unwrap();
        prop_assert_eq!(config.port, port);
    }

    #[test]
    fn capacity_override_always_wins_when_present(capacity in 1usize..1_000_000) {
        let overrides = ConfigOverrides {
            capacity: Some(capacity),
            ..Default::default()
        };
        let config = ServerConfig::load(None, overrides).unwrap();
        prop_assert_eq!(config.capacity, capacity);
    }

    #[test]
    fn absent_overrides_never_change_the_default(workers in 1usize..64) {
        let default_config = ServerConfig::default();
        let overrides = ConfigOverrides {
            workers: Some(workers),
            ..Default::default()
        };
        let config = ServerConfig::load(None, overrides).unwrap();
        prop_assert_eq!(config.port, default_config.port);
        prop_assert_eq!(config.snapshot_path, default_config.snapshot_path);
        prop_assert_eq!(config.workers, workers);
    }
}
