// src/utils/logger.rs
//! Logger setup
//!
//! The engine logs through the `log` facade; binaries and tests wire it to
//! `env_logger`. `RUST_LOG` overrides the default `info` filter.

use env_logger::Env;
use log::SetLoggerError;

/// Initialise the global logger with an `info` default filter
pub fn init_logger() -> Result<(), SetLoggerError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init()
}

/// Initialise a logger that writes through the test harness.
/// Safe to call from every test.
pub fn init_test_logger() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_initialises_once() {
        let _ = init_logger();
        assert!(init_logger().is_err());
        init_test_logger();
        log::info!("logger ready");
    }
}
