// src/monitoring/mod.rs
//! Monitoring Module for the bridge
//!
//! This module provides health checks over the bridge state:
//! - Chain and validator availability scores
//! - Transaction statistics per status
//! - Halted liquidity pools
//!
//! Reports are plain data and serialise to JSON for external dashboards.

mod health_checks;

pub use health_checks::{BridgeStats, HealthCheckConfig, HealthMonitor, HealthReport, HealthStatus};
