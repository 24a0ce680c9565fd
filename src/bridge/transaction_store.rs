// src/bridge/transaction_store.rs
//! Transaction and attestation records
//!
//! Bridge transactions are never deleted; terminal ones remain as audit
//! records. The pending set keeps discovery order for validators and
//! relayers while supporting O(log n) removal.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_program::pubkey::Pubkey;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::{Attestation, BridgeTransaction, ChainId, TransactionId, TransactionStatus};
use crate::error_handling::{BridgeError, BridgeResult};

/// Domain separator for transaction ids
pub const TRANSACTION_DOMAIN: &[u8] = b"layer2-bridge/transaction/v1";

#[derive(BorshSerialize)]
struct TransactionPreimage {
    sender: Pubkey,
    token: Pubkey,
    amount: u64,
    destination_chain: ChainId,
    recipient: Pubkey,
    created_at: u64,
    counter: u64,
}

/// Derive a transaction id from its defining fields and a monotonic counter
#[allow(clippy::too_many_arguments)]
pub fn derive_transaction_id(
    sender: &Pubkey,
    token: &Pubkey,
    amount: u64,
    destination_chain: ChainId,
    recipient: &Pubkey,
    created_at: u64,
    counter: u64,
) -> BridgeResult<TransactionId> {
    let preimage = TransactionPreimage {
        sender: *sender,
        token: *token,
        amount,
        destination_chain,
        recipient: *recipient,
        created_at,
        counter,
    };
    let encoded = preimage
        .try_to_vec()
        .map_err(|e| BridgeError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(TRANSACTION_DOMAIN);
    hasher.update(&encoded);
    Ok(TransactionId(hasher.finalize().into()))
}

/// Persistent transaction state
#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct TransactionStore {
    transactions: HashMap<TransactionId, BridgeTransaction>,

    /// Attestations by transaction, in submission order
    attestations: HashMap<TransactionId, Vec<Attestation>>,

    /// (transaction, validator) pairs already counted
    attesters: HashSet<(TransactionId, Pubkey)>,

    /// Pending transactions by insertion sequence
    pending: BTreeMap<u64, TransactionId>,

    /// Position of each pending transaction in `pending`
    pending_index: HashMap<TransactionId, u64>,

    next_pending_seq: u64,

    /// Settled transactions, independent of status
    processed: HashSet<TransactionId>,

    /// Monotonic counter mixed into transaction ids
    transaction_counter: u64,
}

impl TransactionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter value the next transaction id will use
    pub fn transaction_counter(&self) -> u64 {
        self.transaction_counter
    }

    /// Insert a new transaction and add it to the pending set
    pub fn insert(&mut self, transaction: BridgeTransaction) -> BridgeResult<()> {
        if self.transactions.contains_key(&transaction.id) {
            return Err(BridgeError::AlreadyExists(format!("transaction {}", transaction.id)));
        }

        let seq = self.next_pending_seq;
        self.next_pending_seq += 1;
        self.transaction_counter += 1;

        self.pending.insert(seq, transaction.id);
        self.pending_index.insert(transaction.id, seq);
        self.transactions.insert(transaction.id, transaction);

        Ok(())
    }

    /// Get a transaction
    pub fn get(&self, id: &TransactionId) -> Option<&BridgeTransaction> {
        self.transactions.get(id)
    }

    /// Get a transaction or fail
    pub fn require(&self, id: &TransactionId) -> BridgeResult<&BridgeTransaction> {
        self.transactions.get(id).ok_or(BridgeError::TransactionNotFound(*id))
    }

    /// Get a transaction mutably or fail
    pub fn require_mut(&mut self, id: &TransactionId) -> BridgeResult<&mut BridgeTransaction> {
        self.transactions.get_mut(id).ok_or(BridgeError::TransactionNotFound(*id))
    }

    /// Remove a transaction from the pending set
    pub fn remove_pending(&mut self, id: &TransactionId) {
        if let Some(seq) = self.pending_index.remove(id) {
            self.pending.remove(&seq);
        }
    }

    /// Whether a transaction is in the pending set
    pub fn is_pending(&self, id: &TransactionId) -> bool {
        self.pending_index.contains_key(id)
    }

    /// Pending transactions in discovery order
    pub fn pending_ids(&self) -> Vec<TransactionId> {
        self.pending.values().copied().collect()
    }

    /// Whether the validator already attested the transaction
    pub fn has_attested(&self, id: &TransactionId, validator: &Pubkey) -> bool {
        self.attesters.contains(&(*id, *validator))
    }

    /// Record an attestation, at most one per (transaction, validator)
    pub fn add_attestation(&mut self, attestation: Attestation) -> BridgeResult<()> {
        let key = (attestation.transaction_id, attestation.validator);
        if self.attesters.contains(&key) {
            return Err(BridgeError::DuplicateAttestation {
                id: attestation.transaction_id,
                validator: attestation.validator,
            });
        }

        self.attesters.insert(key);
        self.attestations
            .entry(attestation.transaction_id)
            .or_default()
            .push(attestation);

        Ok(())
    }

    /// Attestations of a transaction
    pub fn attestations(&self, id: &TransactionId) -> &[Attestation] {
        self.attestations.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mark a transaction settled; false if it already was
    pub fn mark_processed(&mut self, id: &TransactionId) -> bool {
        self.processed.insert(*id)
    }

    /// Whether a transaction was settled
    pub fn is_processed(&self, id: &TransactionId) -> bool {
        self.processed.contains(id)
    }

    /// Number of transactions per status
    pub fn count_by_status(&self) -> HashMap<TransactionStatus, usize> {
        let mut counts = HashMap::new();
        for transaction in self.transactions.values() {
            *counts.entry(transaction.status).or_insert(0) += 1;
        }
        counts
    }

    /// Number of transactions ever created
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether no transaction was ever created
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
