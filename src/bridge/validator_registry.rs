// src/bridge/validator_registry.rs
//! Validator Registry for the bridge
//!
//! This module tracks the permissioned validator set:
//! - Validator admission, removal and slashing
//! - Minimum active validator count
//! - Per-validator replay-protection nonce
//! - Attestation counters, accuracy and rewards
//!
//! Nonces only ever increase, including across removal and re-admission,
//! so an attestation proof can never be replayed.

use borsh::{BorshDeserialize, BorshSerialize};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::collections::HashMap;

use super::types::{apply_bps, BPS_DENOMINATOR};
use crate::error_handling::{BridgeError, BridgeResult};

/// Validator set configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValidatorSetConfig {
    /// Active validators that must remain registered
    pub min_active_validators: u32,

    /// Stake below which a slashed validator is deactivated
    pub min_validator_stake: u64,
}

impl Default for ValidatorSetConfig {
    fn default() -> Self {
        Self {
            min_active_validators: 3,
            min_validator_stake: 0,
        }
    }
}

/// Validator information
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ValidatorInfo {
    /// Validator identity
    pub validator: Pubkey,

    /// Whether the validator may attest
    pub is_active: bool,

    /// Bonded stake
    pub stake: u64,

    /// Attestations submitted
    pub total_attestations: u64,

    /// Attestations scored against a final outcome
    pub scored_attestations: u64,

    /// Scored attestations that matched the outcome
    pub correct_attestations: u64,

    /// Next nonce expected in an attestation proof
    pub nonce: u64,

    /// Fee rewards earned
    pub rewards_earned: u64,

    /// Stake removed by slashing
    pub slashed_total: u64,

    /// Admission timestamp
    pub joined_at: u64,

    /// Removal timestamp (if removed)
    pub removed_at: Option<u64>,
}

impl ValidatorInfo {
    /// Lifetime accuracy in basis points (10000 until first scored attestation)
    pub fn accuracy_bps(&self) -> u32 {
        if self.scored_attestations == 0 {
            return BPS_DENOMINATOR as u32;
        }
        (self.correct_attestations * BPS_DENOMINATOR / self.scored_attestations) as u32
    }
}

/// Validator registry
#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct ValidatorRegistry {
    config: ValidatorSetConfig,
    validators: HashMap<Pubkey, ValidatorInfo>,
    active_count: u32,
}

impl ValidatorRegistry {
    /// Create a registry with the specified configuration
    pub fn with_config(config: ValidatorSetConfig) -> Self {
        Self {
            config,
            validators: HashMap::new(),
            active_count: 0,
        }
    }

    /// Admit a validator, or re-admit a removed one
    pub fn add_validator(&mut self, validator: Pubkey, stake: u64, now: u64) -> BridgeResult<()> {
        match self.validators.get_mut(&validator) {
            Some(info) if info.is_active => return Err(BridgeError::ValidatorAlreadyExists(validator)),
            Some(info) => {
                info.is_active = true;
                info.stake = stake;
                info.joined_at = now;
                info.removed_at = None;
            }
            None => {
                self.validators.insert(
                    validator,
                    ValidatorInfo {
                        validator,
                        is_active: true,
                        stake,
                        total_attestations: 0,
                        scored_attestations: 0,
                        correct_attestations: 0,
                        nonce: 0,
                        rewards_earned: 0,
                        slashed_total: 0,
                        joined_at: now,
                        removed_at: None,
                    },
                );
            }
        }
        self.active_count += 1;

        info!("Validator added: {}, stake {}", validator, stake);

        Ok(())
    }

    /// Deactivate a validator
    pub fn remove_validator(&mut self, validator: &Pubkey, now: u64) -> BridgeResult<()> {
        let info = self
            .validators
            .get(validator)
            .ok_or(BridgeError::ValidatorNotFound(*validator))?;
        if !info.is_active {
            return Err(BridgeError::ValidatorNotActive(*validator));
        }
        if self.active_count <= self.config.min_active_validators {
            return Err(BridgeError::BelowMinimumValidators {
                min: self.config.min_active_validators,
            });
        }

        self.deactivate(validator, now);

        info!("Validator removed: {}", validator);

        Ok(())
    }

    /// Slash `slash_bps` of a validator's stake, returning the amount slashed
    pub fn slash_validator(
        &mut self,
        validator: &Pubkey,
        slash_bps: u32,
        reason: &str,
        now: u64,
    ) -> BridgeResult<u64> {
        if slash_bps == 0 || slash_bps as u64 > BPS_DENOMINATOR {
            return Err(BridgeError::InvalidArgument(format!(
                "slash of {} bps outside (0, {}]",
                slash_bps, BPS_DENOMINATOR
            )));
        }

        let min_active = self.config.min_active_validators;
        let min_stake = self.config.min_validator_stake;
        let active_count = self.active_count;

        let info = self
            .validators
            .get_mut(validator)
            .ok_or(BridgeError::ValidatorNotFound(*validator))?;

        let slashed = apply_bps(info.stake, slash_bps)?;
        info.stake -= slashed;
        info.slashed_total = info.slashed_total.saturating_add(slashed);
        let below_min_stake = info.is_active && info.stake < min_stake;

        warn!(
            "Validator slashed: {}, amount {}, remaining stake {}, reason: {}",
            validator, slashed, info.stake, reason
        );

        if below_min_stake {
            if active_count > min_active {
                self.deactivate(validator, now);
                warn!("Validator {} deactivated: stake below {}", validator, min_stake);
            } else {
                warn!(
                    "Validator {} stake below {} but kept active to preserve {} validators",
                    validator, min_stake, min_active
                );
            }
        }

        Ok(slashed)
    }

    /// Check if a validator may attest
    pub fn is_active(&self, validator: &Pubkey) -> bool {
        self.validators.get(validator).map(|v| v.is_active).unwrap_or(false)
    }

    /// Get a validator
    pub fn get_validator(&self, validator: &Pubkey) -> Option<&ValidatorInfo> {
        self.validators.get(validator)
    }

    /// Active validators, sorted
    pub fn active_validators(&self) -> Vec<Pubkey> {
        let mut active: Vec<Pubkey> = self
            .validators
            .values()
            .filter(|v| v.is_active)
            .map(|v| v.validator)
            .collect();
        active.sort();
        active
    }

    /// Number of active validators
    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    /// Number of validators ever registered
    pub fn total_count(&self) -> usize {
        self.validators.len()
    }

    /// Nonce the validator must bind into its next proof
    pub fn expected_nonce(&self, validator: &Pubkey) -> BridgeResult<u64> {
        self.validators
            .get(validator)
            .map(|v| v.nonce)
            .ok_or(BridgeError::ValidatorNotFound(*validator))
    }

    /// Count an accepted attestation and consume the nonce
    pub fn record_attestation(&mut self, validator: &Pubkey) -> BridgeResult<()> {
        let info = self
            .validators
            .get_mut(validator)
            .ok_or(BridgeError::ValidatorNotFound(*validator))?;
        info.nonce = info
            .nonce
            .checked_add(1)
            .ok_or_else(|| BridgeError::Arithmetic("validator nonce overflow".into()))?;
        info.total_attestations += 1;
        Ok(())
    }

    /// Score an attestation against the final outcome
    pub fn record_outcome(&mut self, validator: &Pubkey, correct: bool) {
        if let Some(info) = self.validators.get_mut(validator) {
            info.scored_attestations += 1;
            if correct {
                info.correct_attestations += 1;
            }
        }
    }

    /// Add to a validator's earned rewards
    pub fn credit_reward(&mut self, validator: &Pubkey, amount: u64) {
        if let Some(info) = self.validators.get_mut(validator) {
            info.rewards_earned = info.rewards_earned.saturating_add(amount);
        }
    }

    fn deactivate(&mut self, validator: &Pubkey, now: u64) {
        if let Some(info) = self.validators.get_mut(validator) {
            if info.is_active {
                info.is_active = false;
                info.removed_at = Some(now);
                self.active_count -= 1;
            }
        }
    }
}
