// src/bridge/settlement_engine.rs
//! Settlement Engine for the bridge
//!
//! Executes VALIDATED transactions once their challenge window has
//! elapsed:
//! - Delivers value to the recipient according to the token's bridge mode
//! - Marks the transaction processed, independently of its status
//! - Distributes the fee between the valid attesters and the relayer
//! - Scores every attester against the outcome
//!
//! Everything that can fail is checked before the first mutation, so a
//! refused settlement leaves the transaction VALIDATED and retryable.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use super::ledger::Ledger;
use super::liquidity_pool::LiquidityPool;
use super::token_registry::TokenRegistry;
use super::transaction_store::TransactionStore;
use super::types::{apply_bps, BridgeMode, ChainId, TransactionId, TransactionStatus};
use super::validator_registry::ValidatorRegistry;
use crate::error_handling::{BridgeError, BridgeResult};

/// Settlement settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    /// Challenge period (in seconds)
    pub challenge_period: u64,

    /// Share of the fee paid to valid attesters (in basis points)
    pub validator_reward_bps: u32,
}

/// How a collected fee was paid out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistribution {
    /// Reward paid to each valid attester
    pub per_validator: u64,

    /// Valid attesters rewarded
    pub validators: Vec<Pubkey>,

    /// Paid to the relayer, including rounding remainders
    pub relayer_reward: u64,
}

/// Destination-side settlement
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    config: SettlementConfig,
}

impl SettlementEngine {
    /// Create a settlement engine with the specified configuration
    pub fn with_config(config: SettlementConfig) -> Self {
        Self { config }
    }

    /// Split `fee` between `attesters` and the relayer
    pub fn split_fee(&self, fee: u64, attesters: Vec<Pubkey>) -> BridgeResult<FeeDistribution> {
        if attesters.is_empty() {
            return Ok(FeeDistribution {
                per_validator: 0,
                validators: attesters,
                relayer_reward: fee,
            });
        }

        let validator_share = apply_bps(fee, self.config.validator_reward_bps)?;
        let per_validator = validator_share / attesters.len() as u64;
        let relayer_reward = fee - per_validator * attesters.len() as u64;

        Ok(FeeDistribution {
            per_validator,
            validators: attesters,
            relayer_reward,
        })
    }

    /// Settle a VALIDATED transaction on `executing_chain`
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &self,
        id: &TransactionId,
        relayer: &Pubkey,
        executing_chain: ChainId,
        store: &mut TransactionStore,
        tokens: &TokenRegistry,
        ledger: &mut Ledger,
        pools: &mut LiquidityPool,
        validators: &mut ValidatorRegistry,
        now: u64,
    ) -> BridgeResult<FeeDistribution> {
        if store.is_processed(id) {
            warn!("Execution refused: {} already processed", id);
            return Err(BridgeError::AlreadyProcessed(*id));
        }

        let transaction = store.require(id)?;
        transaction.ensure_status(TransactionStatus::Validated)?;

        if transaction.destination_chain != executing_chain {
            return Err(BridgeError::ChainMismatch {
                expected: transaction.destination_chain,
                actual: executing_chain,
            });
        }

        let validated_at = transaction.validated_at.ok_or_else(|| {
            BridgeError::InvariantViolation(format!("validated transaction {} has no timestamp", id))
        })?;
        let ready_at = validated_at
            .checked_add(self.config.challenge_period)
            .ok_or_else(|| BridgeError::Arithmetic("challenge window overflow".into()))?;
        if now < ready_at {
            return Err(BridgeError::ChallengePeriodActive { ready_at });
        }

        let token = transaction.token;
        let amount = transaction.amount;
        let fee = transaction.fee;
        let recipient = transaction.recipient;
        let delivered = transaction.delivered_amount.unwrap_or(amount);

        let config = tokens.get_token(&token).ok_or(BridgeError::InvalidToken(token))?;
        let mode = config.mode;
        let asset = config.destination_asset();

        let attesters: Vec<Pubkey> = store
            .attestations(id)
            .iter()
            .filter(|a| a.is_valid)
            .map(|a| a.validator)
            .collect();
        let distribution = self.split_fee(fee, attesters)?;

        let from_escrow = match mode {
            BridgeMode::BurnMint => fee.checked_add(amount),
            _ => Some(fee),
        }
        .ok_or_else(|| BridgeError::Arithmetic("settlement overflow".into()))?;
        if ledger.escrowed(&token) < from_escrow {
            return Err(BridgeError::InvariantViolation(format!(
                "escrow for {} cannot cover settlement of {}",
                token, id
            )));
        }

        ledger.ensure_can_credit(&recipient, &asset, delivered)?;
        for validator in &distribution.validators {
            ledger.ensure_can_credit(validator, &token, distribution.per_validator)?;
        }
        ledger.ensure_can_credit(relayer, &token, distribution.relayer_reward)?;

        match mode {
            BridgeMode::LockMint => {
                ledger.mint(&recipient, &asset, delivered)?;
            }
            BridgeMode::BurnMint => {
                ledger.burn_escrow(&token, amount)?;
                ledger.mint(&recipient, &asset, delivered)?;
            }
            BridgeMode::LiquidityPool => {
                pools.debit(&asset, delivered, now)?;
                ledger.credit(&recipient, &asset, delivered)?;
            }
        }

        store.mark_processed(id);
        let transaction = store.require_mut(id)?;
        transaction.transition(TransactionStatus::Executed)?;
        transaction.executed_at = Some(now);
        transaction.relayer = Some(*relayer);
        store.remove_pending(id);

        for validator in &distribution.validators {
            ledger.release(&token, validator, distribution.per_validator)?;
            validators.credit_reward(validator, distribution.per_validator);
        }
        ledger.release(&token, relayer, distribution.relayer_reward)?;

        for attestation in store.attestations(id) {
            validators.record_outcome(&attestation.validator, attestation.is_valid);
        }

        debug!(
            "Fee for {}: {} to each of {} validators, {} to relayer {}",
            id,
            distribution.per_validator,
            distribution.validators.len(),
            distribution.relayer_reward,
            relayer
        );
        info!(
            "Transaction executed: {}, {:?} delivered {} of {} to {}",
            id, mode, delivered, asset, recipient
        );

        Ok(distribution)
    }
}
