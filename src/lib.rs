// src/lib.rs
//! Layer-2 Bridge - Validator-attested cross-chain transfers
//!
//! This crate implements the transaction lifecycle of a permissioned bridge:
//! - Transfer initiation with escrow and fee computation
//! - Multi-validator attestation with quorum and approval threshold
//! - Time-boxed challenge window with manual resolution
//! - Settlement by minting, burn-and-mint or pooled liquidity
//! - Fee distribution to attesting validators and relayers
//! - Health reporting over the registered chains and validators

pub mod bridge;
pub mod error_handling;
pub mod monitoring;
pub mod utils;

pub use bridge::{
    Attestation, AttestationOutcome, AttestationVerifier, BridgeConfig, BridgeEngine, BridgeMode,
    BridgeTransaction, ChainConfig, ChainId, ConversionOracle, Ed25519AttestationVerifier,
    FixedRateOracle, SharedBridge, SnapshotStore, TokenConfig, TransactionId, TransactionStatus,
    TransferRequest,
};
pub use error_handling::{BridgeError, BridgeResult, ErrorCategory};
pub use monitoring::{BridgeStats, HealthMonitor, HealthReport, HealthStatus};
pub use utils::{Clock, ManualClock, SystemClock};
