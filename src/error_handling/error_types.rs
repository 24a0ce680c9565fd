// src/error_handling/error_types.rs
//! Error types for the bridge engine
//!
//! Every bridge operation reports failures through `BridgeError`. Each
//! variant carries a stable error code and belongs to one `ErrorCategory`,
//! which tells the caller whether retrying can ever succeed.

use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use thiserror::Error;

use crate::bridge::{ChainId, TransactionId, TransactionStatus};

/// Result alias used across the crate
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Broad class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input, rejected before any state is touched
    Validation,

    /// Operation attempted against a record in the wrong state
    StateConflict,

    /// A resource (liquidity, fee, balance, limit) is insufficient right now
    ResourceExhaustion,

    /// Consensus or dispute rules refused the operation
    ConsensusFailure,

    /// State corruption or infrastructure failure; processing must stop
    Fatal,
}

/// Bridge errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // Validation
    #[error("Invalid token: {0}")]
    InvalidToken(Pubkey),

    #[error("Invalid chain: {0}")]
    InvalidChain(ChainId),

    #[error("Amount {amount} out of bounds [{min}, {max}]")]
    AmountOutOfBounds { amount: u64, min: u64, max: u64 },

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unauthorized caller: {0}")]
    Unauthorized(Pubkey),

    // State conflicts
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Transaction {id} is {actual}, expected {expected}")]
    InvalidStatus {
        id: TransactionId,
        expected: TransactionStatus,
        actual: TransactionStatus,
    },

    #[error("Transaction already processed: {0}")]
    AlreadyProcessed(TransactionId),

    #[error("Validator {validator} already attested for {id}")]
    DuplicateAttestation { id: TransactionId, validator: Pubkey },

    #[error("Validator not active: {0}")]
    ValidatorNotActive(Pubkey),

    #[error("Validator not found: {0}")]
    ValidatorNotFound(Pubkey),

    #[error("Validator already registered: {0}")]
    ValidatorAlreadyExists(Pubkey),

    #[error("Already registered: {0}")]
    AlreadyExists(String),

    #[error("Chain mismatch: transaction targets {expected}, executing on {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },

    #[error("Challenge period still active until {ready_at}")]
    ChallengePeriodActive { ready_at: u64 },

    #[error("Challenge period ended at {ended_at}")]
    ChallengePeriodExpired { ended_at: u64 },

    #[error("Bridge is paused")]
    Paused,

    // Resource exhaustion
    #[error("Insufficient fee: required {required}, paid {paid}")]
    InsufficientFee { required: u64, paid: u64 },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Insufficient liquidity for {token}: required {required}, available {available}")]
    InsufficientLiquidity {
        token: Pubkey,
        required: u64,
        available: u64,
    },

    #[error("Insufficient pool liquidity for {token}: requested {requested}, withdrawable {available}")]
    InsufficientPoolLiquidity {
        token: Pubkey,
        requested: u64,
        available: u64,
    },

    #[error("Insufficient shares: requested {requested}, owned {owned}")]
    InsufficientShares { requested: u64, owned: u64 },

    #[error("Daily limit exceeded for {token}: limit {limit}, used {used}, requested {requested}")]
    DailyLimitExceeded {
        token: Pubkey,
        limit: u64,
        used: u64,
        requested: u64,
    },

    // Consensus
    #[error("Invalid attestation proof: {0}")]
    InvalidProof(String),

    #[error("Active validator count would drop below minimum {min}")]
    BelowMinimumValidators { min: u32 },

    #[error("Conversion oracle unavailable for {from} -> {to}")]
    OracleUnavailable { from: Pubkey, to: Pubkey },

    // Fatal
    #[error("Liquidity pool halted: {0}")]
    PoolHalted(Pubkey),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Arithmetic overflow: {0}")]
    Arithmetic(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Engine halted after a fatal error")]
    EngineHalted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Stable numeric code, grouped by category
    pub fn error_code(&self) -> u32 {
        match self {
            BridgeError::InvalidToken(_) => 1000,
            BridgeError::InvalidChain(_) => 1001,
            BridgeError::AmountOutOfBounds { .. } => 1002,
            BridgeError::InvalidRecipient => 1003,
            BridgeError::InvalidArgument(_) => 1004,
            BridgeError::InvalidConfig(_) => 1005,
            BridgeError::Unauthorized(_) => 1006,
            BridgeError::TransactionNotFound(_) => 2000,
            BridgeError::InvalidStatus { .. } => 2001,
            BridgeError::AlreadyProcessed(_) => 2002,
            BridgeError::DuplicateAttestation { .. } => 2003,
            BridgeError::ValidatorNotActive(_) => 2004,
            BridgeError::ValidatorNotFound(_) => 2005,
            BridgeError::ValidatorAlreadyExists(_) => 2006,
            BridgeError::AlreadyExists(_) => 2007,
            BridgeError::ChainMismatch { .. } => 2008,
            BridgeError::ChallengePeriodActive { .. } => 2009,
            BridgeError::ChallengePeriodExpired { .. } => 2010,
            BridgeError::Paused => 2011,
            BridgeError::InsufficientFee { .. } => 3000,
            BridgeError::InsufficientBalance { .. } => 3001,
            BridgeError::InsufficientLiquidity { .. } => 3002,
            BridgeError::InsufficientPoolLiquidity { .. } => 3003,
            BridgeError::InsufficientShares { .. } => 3004,
            BridgeError::DailyLimitExceeded { .. } => 3005,
            BridgeError::InvalidProof(_) => 4000,
            BridgeError::BelowMinimumValidators { .. } => 4001,
            BridgeError::OracleUnavailable { .. } => 4002,
            BridgeError::PoolHalted(_) => 5000,
            BridgeError::InvariantViolation(_) => 5001,
            BridgeError::Arithmetic(_) => 5002,
            BridgeError::Storage(_) => 5003,
            BridgeError::Serialization(_) => 5004,
            BridgeError::EngineHalted => 5005,
            BridgeError::Internal(_) => 5006,
        }
    }

    /// Category of the error
    pub fn category(&self) -> ErrorCategory {
        match self.error_code() {
            1000..=1999 => ErrorCategory::Validation,
            2000..=2999 => ErrorCategory::StateConflict,
            3000..=3999 => ErrorCategory::ResourceExhaustion,
            4000..=4999 => ErrorCategory::ConsensusFailure,
            _ => ErrorCategory::Fatal,
        }
    }

    /// Whether the same call may succeed later without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::ChallengePeriodActive { .. }
                | BridgeError::Paused
                | BridgeError::InsufficientLiquidity { .. }
                | BridgeError::InsufficientPoolLiquidity { .. }
                | BridgeError::DailyLimitExceeded { .. }
        )
    }

    /// Whether the error requires halting the affected resource
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }
}

impl From<BridgeError> for ProgramError {
    fn from(error: BridgeError) -> Self {
        ProgramError::Custom(error.error_code())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(error: std::io::Error) -> Self {
        BridgeError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(error: serde_json::Error) -> Self {
        BridgeError::Serialization(error.to_string())
    }
}
