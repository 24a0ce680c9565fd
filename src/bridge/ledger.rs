// src/bridge/ledger.rs
//! Account balances and custody
//!
//! Tracks per-account token balances together with the bridge's own
//! custody: funds escrowed by pending transfers, supply minted on the
//! destination side and supply burned on the source side.

use borsh::{BorshDeserialize, BorshSerialize};
use log::debug;
use solana_program::pubkey::Pubkey;
use std::collections::HashMap;

use crate::error_handling::{BridgeError, BridgeResult};

/// Balance ledger
#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct Ledger {
    /// Balances by (account, token)
    balances: HashMap<(Pubkey, Pubkey), u64>,

    /// Escrowed amounts (transfer amount plus fee) by token
    escrow: HashMap<Pubkey, u64>,

    /// Total minted by token
    minted: HashMap<Pubkey, u64>,

    /// Total burned by token
    burned: HashMap<Pubkey, u64>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of an account
    pub fn balance(&self, account: &Pubkey, token: &Pubkey) -> u64 {
        *self.balances.get(&(*account, *token)).unwrap_or(&0)
    }

    /// Amount held in escrow for a token
    pub fn escrowed(&self, token: &Pubkey) -> u64 {
        *self.escrow.get(token).unwrap_or(&0)
    }

    /// Total minted for a token
    pub fn minted(&self, token: &Pubkey) -> u64 {
        *self.minted.get(token).unwrap_or(&0)
    }

    /// Total burned for a token
    pub fn burned(&self, token: &Pubkey) -> u64 {
        *self.burned.get(token).unwrap_or(&0)
    }

    /// Credit an account
    pub fn credit(&mut self, account: &Pubkey, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        let balance = self.balances.entry((*account, *token)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| BridgeError::Arithmetic(format!("balance overflow for {}", account)))?;
        Ok(())
    }

    /// Fail if crediting `amount` to an account would overflow its balance
    pub fn ensure_can_credit(&self, account: &Pubkey, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        self.balance(account, token)
            .checked_add(amount)
            .map(|_| ())
            .ok_or_else(|| BridgeError::Arithmetic(format!("balance overflow for {}", account)))
    }

    /// Fail if escrowing `amount` more of a token would overflow
    pub fn ensure_can_lock(&self, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        self.escrowed(token)
            .checked_add(amount)
            .map(|_| ())
            .ok_or_else(|| BridgeError::Arithmetic("escrow overflow".into()))
    }

    /// Debit an account
    pub fn debit(&mut self, account: &Pubkey, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        let available = self.balance(account, token);
        if available < amount {
            return Err(BridgeError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        self.balances.insert((*account, *token), available - amount);
        Ok(())
    }

    /// Move funds from an account into escrow
    pub fn lock(&mut self, account: &Pubkey, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        let escrowed = self
            .escrowed(token)
            .checked_add(amount)
            .ok_or_else(|| BridgeError::Arithmetic("escrow overflow".into()))?;
        self.debit(account, token, amount)?;
        self.escrow.insert(*token, escrowed);

        debug!("Locked {} of {} from {}", amount, token, account);

        Ok(())
    }

    /// Release escrowed funds to an account
    pub fn release(&mut self, token: &Pubkey, to: &Pubkey, amount: u64) -> BridgeResult<()> {
        self.take_from_escrow(token, amount)?;
        self.credit(to, token, amount)?;

        debug!("Released {} of {} to {}", amount, token, to);

        Ok(())
    }

    /// Burn escrowed funds
    pub fn burn_escrow(&mut self, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        self.take_from_escrow(token, amount)?;
        let burned = self.burned.entry(*token).or_insert(0);
        *burned = burned.saturating_add(amount);

        debug!("Burned {} of {}", amount, token);

        Ok(())
    }

    /// Mint new supply to an account
    pub fn mint(&mut self, to: &Pubkey, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        self.credit(to, token, amount)?;
        let minted = self.minted.entry(*token).or_insert(0);
        *minted = minted.saturating_add(amount);

        debug!("Minted {} of {} to {}", amount, token, to);

        Ok(())
    }

    fn take_from_escrow(&mut self, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        let escrowed = self.escrowed(token);
        if escrowed < amount {
            return Err(BridgeError::InvariantViolation(format!(
                "escrow for {} holds {}, {} requested",
                token, escrowed, amount
            )));
        }
        self.escrow.insert(*token, escrowed - amount);
        Ok(())
    }
}
