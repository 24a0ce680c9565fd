// src/monitoring/health_checks.rs
//! Health Checks Module for the bridge
//!
//! This module scores the bridge from its own state:
//! - Chain health: share of registered chains that are active
//! - Validator health: share of registered validators that are active
//! - Transaction statistics per status and halted pools
//!
//! Scores are in basis points; the overall status is derived from their
//! mean, and any halted pool makes the bridge critical.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bridge::types::{TransactionStatus, BPS_DENOMINATOR};
use crate::bridge::BridgeState;
use crate::error_handling::BridgeResult;

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Healthy
    Healthy,

    /// Warning
    Warning,

    /// Critical
    Critical,

    /// Nothing registered yet
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Warning => write!(f, "WARNING"),
            HealthStatus::Critical => write!(f, "CRITICAL"),
            HealthStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Health check configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Minimum overall score (in basis points) reported as healthy
    pub healthy_bps: u32,

    /// Minimum overall score (in basis points) reported as warning
    pub warning_bps: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            healthy_bps: 8_000,
            warning_bps: 5_000,
        }
    }
}

/// Transaction statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Transactions ever created
    pub total_transactions: usize,

    /// Transactions per status
    pub by_status: BTreeMap<String, usize>,

    /// Size of the pending set
    pub pending: usize,

    /// Tokens whose pool is halted
    pub halted_pools: Vec<String>,
}

/// Point-in-time health of the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: u64,
    pub status: HealthStatus,
    pub chain_health_bps: u32,
    pub validator_health_bps: u32,
    pub overall_health_bps: u32,
    pub active_chains: usize,
    pub total_chains: usize,
    pub active_validators: usize,
    pub total_validators: usize,
    pub paused: bool,
    pub stats: BridgeStats,
}

impl HealthReport {
    /// Render the report as JSON
    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Bridge health monitor
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    config: HealthCheckConfig,
}

impl HealthMonitor {
    /// Create a monitor with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a monitor with the specified thresholds
    pub fn with_config(config: HealthCheckConfig) -> Self {
        Self { config }
    }

    /// Score the bridge state
    pub fn report(&self, state: &BridgeState, now: u64) -> HealthReport {
        let active_chains = state.chains.active_count();
        let total_chains = state.chains.total_count();
        let active_validators = state.validators.active_count() as usize;
        let total_validators = state.validators.total_count();

        let chain_health_bps = ratio_bps(active_chains, total_chains);
        let validator_health_bps = ratio_bps(active_validators, total_validators);
        let overall_health_bps = (chain_health_bps + validator_health_bps) / 2;

        let stats = self.stats(state);

        let status = if total_chains == 0 && total_validators == 0 {
            HealthStatus::Unknown
        } else if !stats.halted_pools.is_empty() {
            HealthStatus::Critical
        } else {
            self.classify(overall_health_bps)
        };

        HealthReport {
            timestamp: now,
            status,
            chain_health_bps,
            validator_health_bps,
            overall_health_bps,
            active_chains,
            total_chains,
            active_validators,
            total_validators,
            paused: state.paused,
            stats,
        }
    }

    /// Transaction statistics
    pub fn stats(&self, state: &BridgeState) -> BridgeStats {
        let counts = state.transactions.count_by_status();
        let by_status = [
            TransactionStatus::Pending,
            TransactionStatus::Validated,
            TransactionStatus::Challenged,
            TransactionStatus::Executed,
            TransactionStatus::Failed,
            TransactionStatus::Rejected,
            TransactionStatus::Cancelled,
        ]
        .iter()
        .map(|status| (status.to_string(), *counts.get(status).unwrap_or(&0)))
        .collect();

        BridgeStats {
            total_transactions: state.transactions.len(),
            by_status,
            pending: state.transactions.pending_ids().len(),
            halted_pools: state
                .pools
                .halted_pools()
                .iter()
                .map(|token| token.to_string())
                .collect(),
        }
    }

    fn classify(&self, score_bps: u32) -> HealthStatus {
        if score_bps >= self.config.healthy_bps {
            HealthStatus::Healthy
        } else if score_bps >= self.config.warning_bps {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

fn ratio_bps(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as u64 * BPS_DENOMINATOR / whole as u64) as u32
}
