// src/bridge/transfer_engine.rs
//! Transfer Engine for the bridge
//!
//! Turns a user request into a PENDING bridge transaction:
//! - Validates token, destination chain, amount and recipient
//! - Computes the fee deterministically from the registered rates
//! - Escrows the amount and the fee from the sender
//! - Publishes the transaction to the pending set
//!
//! The fee formula only uses registry data and the amount so validators
//! can recompute it independently.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use super::chain_registry::ChainRegistry;
use super::ledger::Ledger;
use super::token_registry::TokenRegistry;
use super::transaction_store::{derive_transaction_id, TransactionStore};
use super::types::{apply_bps, BridgeTransaction, ChainId, TransactionId, TransactionStatus};
use crate::error_handling::{BridgeError, BridgeResult};

/// A user's request to move funds across the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender: Pubkey,
    pub token: Pubkey,
    pub amount: u64,
    pub destination_chain: ChainId,
    pub recipient: Pubkey,
    /// Fee offered by the sender, at least the quoted fee
    pub fee_paid: u64,
}

/// Breakdown of a transfer fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub base_fee: u64,
    pub chain_fee: u64,
    pub token_fee: u64,
}

impl FeeQuote {
    /// Total fee
    pub fn total(&self) -> BridgeResult<u64> {
        self.base_fee
            .checked_add(self.chain_fee)
            .and_then(|f| f.checked_add(self.token_fee))
            .ok_or_else(|| BridgeError::Arithmetic("fee overflow".into()))
    }
}

/// Transfer engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    pub local_chain_id: ChainId,
    pub base_fee_bps: u32,
    pub min_amount: u64,
    pub max_amount: u64,
}

/// Creates and cancels bridge transactions
#[derive(Debug, Clone)]
pub struct TransferEngine {
    config: TransferConfig,
}

impl TransferEngine {
    /// Create a transfer engine with the specified configuration
    pub fn with_config(config: TransferConfig) -> Self {
        Self { config }
    }

    /// Fee for moving `amount` of `token` to `destination_chain`
    pub fn quote_fee(
        &self,
        chains: &ChainRegistry,
        tokens: &TokenRegistry,
        token: &Pubkey,
        destination_chain: ChainId,
        amount: u64,
    ) -> BridgeResult<FeeQuote> {
        Ok(FeeQuote {
            base_fee: apply_bps(amount, self.config.base_fee_bps)?,
            chain_fee: apply_bps(amount, chains.fee_rate(destination_chain)?)?,
            token_fee: apply_bps(amount, tokens.fee_rate(token)?)?,
        })
    }

    /// Validate a request, escrow its funds and record it as PENDING
    pub fn initiate(
        &self,
        request: &TransferRequest,
        chains: &ChainRegistry,
        tokens: &mut TokenRegistry,
        ledger: &mut Ledger,
        store: &mut TransactionStore,
        now: u64,
    ) -> BridgeResult<TransactionId> {
        let fee = self.validate(request, chains, tokens, now)?;

        let escrow = request
            .amount
            .checked_add(request.fee_paid)
            .ok_or_else(|| BridgeError::Arithmetic("escrow overflow".into()))?;
        let available = ledger.balance(&request.sender, &request.token);
        if available < escrow {
            return Err(BridgeError::InsufficientBalance {
                required: escrow,
                available,
            });
        }
        ledger.ensure_can_lock(&request.token, escrow)?;

        let id = derive_transaction_id(
            &request.sender,
            &request.token,
            request.amount,
            request.destination_chain,
            &request.recipient,
            now,
            store.transaction_counter(),
        )?;

        let transaction = BridgeTransaction {
            id,
            source_chain: self.config.local_chain_id,
            destination_chain: request.destination_chain,
            token: request.token,
            amount: request.amount,
            sender: request.sender,
            recipient: request.recipient,
            fee: request.fee_paid,
            created_at: now,
            validated_at: None,
            executed_at: None,
            closed_at: None,
            status: TransactionStatus::Pending,
            valid_votes: 0,
            invalid_votes: 0,
            challenges: Vec::new(),
            relayer: None,
            delivered_amount: None,
        };

        store.insert(transaction)?;
        ledger.lock(&request.sender, &request.token, escrow)?;
        tokens.record_volume(&request.token, request.amount, now);

        info!(
            "Transfer initiated: {}, {} of {} to chain {}, fee {} (quoted {})",
            id, request.amount, request.token, request.destination_chain, request.fee_paid, fee
        );

        Ok(id)
    }

    /// Cancel a PENDING transaction on behalf of its sender and refund it
    pub fn cancel(
        &self,
        id: &TransactionId,
        caller: &Pubkey,
        store: &mut TransactionStore,
        ledger: &mut Ledger,
        now: u64,
    ) -> BridgeResult<()> {
        let transaction = store.require(id)?;
        if transaction.sender != *caller {
            return Err(BridgeError::Unauthorized(*caller));
        }
        transaction.ensure_status(TransactionStatus::Pending)?;

        close_with_refund(id, TransactionStatus::Cancelled, store, ledger, now)?;

        info!("Transfer cancelled by sender: {}", id);

        Ok(())
    }

    /// Check a request and return the quoted fee
    fn validate(
        &self,
        request: &TransferRequest,
        chains: &ChainRegistry,
        tokens: &TokenRegistry,
        now: u64,
    ) -> BridgeResult<u64> {
        if !tokens.is_token_active(&request.token) {
            warn!("Transfer rejected: token {} not active", request.token);
            return Err(BridgeError::InvalidToken(request.token));
        }
        if request.destination_chain == self.config.local_chain_id
            || !chains.is_chain_active(request.destination_chain)
        {
            warn!("Transfer rejected: chain {} not active", request.destination_chain);
            return Err(BridgeError::InvalidChain(request.destination_chain));
        }
        if request.amount < self.config.min_amount || request.amount > self.config.max_amount {
            return Err(BridgeError::AmountOutOfBounds {
                amount: request.amount,
                min: self.config.min_amount,
                max: self.config.max_amount,
            });
        }
        if request.recipient == Pubkey::default() {
            return Err(BridgeError::InvalidRecipient);
        }

        let fee = self
            .quote_fee(chains, tokens, &request.token, request.destination_chain, request.amount)?
            .total()?;
        if request.fee_paid < fee {
            return Err(BridgeError::InsufficientFee {
                required: fee,
                paid: request.fee_paid,
            });
        }

        tokens.check_daily_limit(&request.token, request.amount, now)?;

        Ok(fee)
    }
}

/// Move a transaction to a refunded terminal status and return its escrow
/// (amount plus fee) to the sender
pub(crate) fn close_with_refund(
    id: &TransactionId,
    status: TransactionStatus,
    store: &mut TransactionStore,
    ledger: &mut Ledger,
    now: u64,
) -> BridgeResult<()> {
    let transaction = store.require(id)?;
    let refund = transaction.refund_amount()?;
    let token = transaction.token;
    let sender = transaction.sender;

    if ledger.escrowed(&token) < refund {
        return Err(BridgeError::InvariantViolation(format!(
            "escrow for {} cannot cover refund of {} for {}",
            token, refund, id
        )));
    }

    let transaction = store.require_mut(id)?;
    transaction.transition(status)?;
    transaction.closed_at = Some(now);
    store.remove_pending(id);
    ledger.release(&token, &sender, refund)?;

    info!("Refunded {} of {} to {} ({}: {})", refund, token, sender, status, id);

    Ok(())
}
