// src/bridge/types.rs
//! Core records of the bridge: transactions, attestations and challenges

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::fmt;

use crate::error_handling::{BridgeError, BridgeResult};

/// Ledger (chain) identifier
pub type ChainId = u64;

/// Basis-point denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// `amount * bps / 10_000`, rounded down
pub fn apply_bps(amount: u64, bps: u32) -> BridgeResult<u64> {
    let scaled = (amount as u128) * (bps as u128) / (BPS_DENOMINATOR as u128);
    u64::try_from(scaled).map_err(|_| BridgeError::Arithmetic(format!("{} bps of {}", bps, amount)))
}

/// Unique bridge transaction identifier (SHA-256 digest)
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct TransactionId(pub [u8; 32]);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", hex::encode(&self.0[..8]))
    }
}

/// How destination-side value is produced
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum BridgeMode {
    /// Source funds stay locked, destination mints
    LockMint,

    /// Source funds are burned, destination mints
    BurnMint,

    /// Destination releases from a pre-funded liquidity pool
    LiquidityPool,
}

/// Lifecycle of a bridge transaction
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum TransactionStatus {
    /// Escrowed, waiting for attestations
    Pending,

    /// Approved by validators, challenge window running
    Validated,

    /// Disputed, waiting for the resolver
    Challenged,

    /// Settled on the destination side
    Executed,

    /// Challenge upheld, refunded
    Failed,

    /// Approval threshold unreachable, refunded
    Rejected,

    /// Cancelled by the sender before consensus, refunded
    Cancelled,
}

impl TransactionStatus {
    /// Whether `next` is a legal transition from this status
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Validated)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Validated, Challenged)
                | (Validated, Executed)
                | (Challenged, Validated)
                | (Challenged, Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Validated => write!(f, "VALIDATED"),
            TransactionStatus::Challenged => write!(f, "CHALLENGED"),
            TransactionStatus::Executed => write!(f, "EXECUTED"),
            TransactionStatus::Failed => write!(f, "FAILED"),
            TransactionStatus::Rejected => write!(f, "REJECTED"),
            TransactionStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Outcome of a challenge decided by the resolver
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ChallengeResolution {
    /// Resolver that decided the challenge
    pub resolver: Pubkey,

    /// Whether the challenge was upheld
    pub upheld: bool,

    /// Resolution note
    pub note: String,

    /// Resolution timestamp
    pub resolved_at: u64,
}

/// A dispute raised against a validated transaction
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ChallengeRecord {
    /// Challenger
    pub challenger: Pubkey,

    /// Reason given by the challenger
    pub reason: String,

    /// Opaque evidence
    pub evidence: Vec<u8>,

    /// Challenge timestamp
    pub challenged_at: u64,

    /// Resolution, once decided
    pub resolution: Option<ChallengeResolution>,
}

/// The unit of work moved across the bridge
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BridgeTransaction {
    pub id: TransactionId,
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub token: Pubkey,
    pub amount: u64,
    pub sender: Pubkey,
    pub recipient: Pubkey,
    /// Fee collected at initiation
    pub fee: u64,
    pub created_at: u64,
    /// Anchors the challenge window
    pub validated_at: Option<u64>,
    pub executed_at: Option<u64>,
    /// Set when the transaction reaches FAILED, REJECTED or CANCELLED
    pub closed_at: Option<u64>,
    pub status: TransactionStatus,
    pub valid_votes: u32,
    pub invalid_votes: u32,
    /// Challenges in submission order; the last one is the current one
    pub challenges: Vec<ChallengeRecord>,
    /// Relayer that triggered execution
    pub relayer: Option<Pubkey>,
    /// Amount delivered on the destination side (after conversion)
    pub delivered_amount: Option<u64>,
}

impl BridgeTransaction {
    /// Amount refunded to the sender when the transfer does not settle
    pub fn refund_amount(&self) -> BridgeResult<u64> {
        self.amount
            .checked_add(self.fee)
            .ok_or_else(|| BridgeError::Arithmetic("refund overflow".into()))
    }

    /// Current (latest) challenge
    pub fn current_challenge(&self) -> Option<&ChallengeRecord> {
        self.challenges.last()
    }

    /// Fail unless the transaction is in `expected`
    pub fn ensure_status(&self, expected: TransactionStatus) -> BridgeResult<()> {
        if self.status != expected {
            return Err(BridgeError::InvalidStatus {
                id: self.id,
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }

    /// Move to `next`, refusing any transition outside the lifecycle
    pub fn transition(&mut self, next: TransactionStatus) -> BridgeResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(BridgeError::InvariantViolation(format!(
                "illegal transition {} -> {} for {}",
                self.status, next, self.id
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// One validator's judgment on one transaction
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Attestation {
    pub transaction_id: TransactionId,
    pub validator: Pubkey,
    pub is_valid: bool,
    /// Validator nonce bound into the proof
    pub nonce: u64,
    pub timestamp: u64,
    pub proof: Vec<u8>,
}
