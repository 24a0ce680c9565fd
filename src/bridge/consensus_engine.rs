// src/bridge/consensus_engine.rs
//! Consensus Engine for the bridge
//!
//! Collects validator attestations for PENDING transactions and decides
//! their fate:
//! - VALIDATED once the quorum is met and the valid share reaches the
//!   approval threshold (inclusive)
//! - REJECTED once the threshold can no longer be reached even if every
//!   active validator that has not attested votes valid
//!
//! A transaction is decided exactly once; later attestations are refused
//! because it is no longer PENDING.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use super::attestation::{attestation_digest, AttestationVerifier};
use super::ledger::Ledger;
use super::transaction_store::TransactionStore;
use super::transfer_engine::close_with_refund;
use super::types::{Attestation, BridgeTransaction, TransactionId, TransactionStatus, BPS_DENOMINATOR};
use super::validator_registry::ValidatorRegistry;
use crate::error_handling::{BridgeError, BridgeResult};

/// Result of an accepted attestation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationOutcome {
    /// Counted; the transaction is still PENDING
    Recorded,

    /// Counted and the transaction became VALIDATED
    Validated,

    /// Counted and the transaction became REJECTED
    Rejected,
}

/// Vote counts used to evaluate a tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub valid: u32,
    pub invalid: u32,
    /// Active validators that have not attested yet
    pub outstanding: u32,
}

/// Consensus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusConfig {
    pub quorum: u32,
    pub approval_threshold_bps: u32,
}

/// Attestation intake and tally evaluation
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    config: ConsensusConfig,
}

impl ConsensusEngine {
    /// Create a consensus engine with the specified configuration
    pub fn with_config(config: ConsensusConfig) -> Self {
        Self { config }
    }

    /// Decide a tally
    pub fn evaluate(&self, tally: &Tally) -> AttestationOutcome {
        let threshold = self.config.approval_threshold_bps as u64;
        let valid = tally.valid as u64;
        let total = valid + tally.invalid as u64;

        if total >= self.config.quorum as u64 && valid * BPS_DENOMINATOR >= threshold * total {
            return AttestationOutcome::Validated;
        }

        let outstanding = tally.outstanding as u64;
        let best_total = total + outstanding;
        let best_valid = valid + outstanding;
        if best_total < self.config.quorum as u64 || best_valid * BPS_DENOMINATOR < threshold * best_total {
            return AttestationOutcome::Rejected;
        }

        AttestationOutcome::Recorded
    }

    /// Verify and count an attestation, then evaluate the tally
    ///
    /// `delivered_amount` is asked for the destination-side amount only when
    /// the transaction is about to be validated, before anything is
    /// mutated; its failure aborts the attestation.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_attestation<F>(
        &self,
        id: &TransactionId,
        validator: &Pubkey,
        is_valid: bool,
        proof: Vec<u8>,
        store: &mut TransactionStore,
        validators: &mut ValidatorRegistry,
        ledger: &mut Ledger,
        verifier: &dyn AttestationVerifier,
        delivered_amount: F,
        now: u64,
    ) -> BridgeResult<AttestationOutcome>
    where
        F: FnOnce(&BridgeTransaction) -> BridgeResult<u64>,
    {
        let transaction = store.require(id)?;
        transaction.ensure_status(TransactionStatus::Pending)?;

        if !validators.is_active(validator) {
            return Err(BridgeError::ValidatorNotActive(*validator));
        }
        if store.has_attested(id, validator) {
            return Err(BridgeError::DuplicateAttestation {
                id: *id,
                validator: *validator,
            });
        }

        let nonce = validators.expected_nonce(validator)?;
        let digest = attestation_digest(id, validator, is_valid, nonce)?;
        if let Err(err) = verifier.verify(validator, &digest, &proof) {
            warn!("Attestation by {} for {} refused: {}", validator, id, err);
            return Err(err);
        }

        let mut tally = self.tally(transaction, validators, store);
        if is_valid {
            tally.valid += 1;
        } else {
            tally.invalid += 1;
        }
        tally.outstanding = tally.outstanding.saturating_sub(1);
        let outcome = self.evaluate(&tally);

        debug!(
            "Tally for {}: {} valid, {} invalid, {} outstanding -> {:?}",
            id, tally.valid, tally.invalid, tally.outstanding, outcome
        );

        let delivered = match outcome {
            AttestationOutcome::Validated => Some(delivered_amount(transaction)?),
            _ => None,
        };

        store.add_attestation(Attestation {
            transaction_id: *id,
            validator: *validator,
            is_valid,
            nonce,
            timestamp: now,
            proof,
        })?;
        validators.record_attestation(validator)?;

        let transaction = store.require_mut(id)?;
        transaction.valid_votes = tally.valid;
        transaction.invalid_votes = tally.invalid;

        match outcome {
            AttestationOutcome::Validated => {
                transaction.transition(TransactionStatus::Validated)?;
                transaction.validated_at = Some(now);
                transaction.delivered_amount = delivered;
                info!(
                    "Transaction validated: {} ({} of {} valid)",
                    id,
                    tally.valid,
                    tally.valid + tally.invalid
                );
            }
            AttestationOutcome::Rejected => {
                close_with_refund(id, TransactionStatus::Rejected, store, ledger, now)?;
                info!(
                    "Transaction rejected: {} ({} valid, {} invalid, {} outstanding)",
                    id, tally.valid, tally.invalid, tally.outstanding
                );
            }
            AttestationOutcome::Recorded => {
                info!("Attestation recorded: {} by {}, valid: {}", id, validator, is_valid);
            }
        }

        Ok(outcome)
    }

    fn tally(
        &self,
        transaction: &BridgeTransaction,
        validators: &ValidatorRegistry,
        store: &TransactionStore,
    ) -> Tally {
        let outstanding = validators
            .active_validators()
            .iter()
            .filter(|v| !store.has_attested(&transaction.id, v))
            .count() as u32;

        Tally {
            valid: transaction.valid_votes,
            invalid: transaction.invalid_votes,
            outstanding,
        }
    }
}
