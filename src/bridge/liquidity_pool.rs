// src/bridge/liquidity_pool.rs
//! Liquidity Pool for the bridge
//!
//! This module implements per-token pools funded by liquidity providers:
//! - Share accounting for deposits and withdrawals
//! - Reservations for validated transfers awaiting settlement
//! - Debits on settlement, never below zero
//! - Halting a pool whose accounting no longer adds up
//!
//! Pools back the `LiquidityPool` bridge mode, where the destination side
//! releases pre-funded reserves instead of minting.

use borsh::{BorshDeserialize, BorshSerialize};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::collections::HashMap;

use crate::error_handling::{BridgeError, BridgeResult};

/// Pooled balance of one token
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct LiquidityPoolState {
    /// Token held by the pool
    pub token: Pubkey,

    /// Current balance
    pub balance: u64,

    /// Outstanding provider shares
    pub total_shares: u64,

    /// Cumulative deposits
    pub total_deposits: u64,

    /// Cumulative provider withdrawals
    pub total_withdrawals: u64,

    /// Cumulative settlement debits
    pub total_settled: u64,

    /// Amount promised to validated transfers awaiting settlement
    pub reserved: u64,

    /// Set when the accounting invariant was found broken
    pub halted: bool,

    /// Last update timestamp
    pub last_update: u64,
}

impl LiquidityPoolState {
    fn new(token: Pubkey) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// Balance not promised to pending settlements
    pub fn available(&self) -> u64 {
        self.balance.saturating_sub(self.reserved)
    }

    /// Whether `balance == deposits - withdrawals - settled`
    pub fn is_consistent(&self) -> bool {
        let expected = self.total_deposits as i128
            - self.total_withdrawals as i128
            - self.total_settled as i128;
        expected == self.balance as i128
    }

    /// Value of `shares` at the current share price
    pub fn shares_to_amount(&self, shares: u64) -> u64 {
        if self.total_shares == 0 {
            return 0;
        }
        ((shares as u128) * (self.balance as u128) / (self.total_shares as u128)) as u64
    }
}

/// Liquidity pools by token
#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct LiquidityPool {
    pools: HashMap<Pubkey, LiquidityPoolState>,

    /// Shares by (provider, token)
    shares: HashMap<(Pubkey, Pubkey), u64>,
}

impl LiquidityPool {
    /// Create an empty set of pools
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool state for a token
    pub fn get_pool(&self, token: &Pubkey) -> Option<&LiquidityPoolState> {
        self.pools.get(token)
    }

    /// Current balance of a token pool
    pub fn balance(&self, token: &Pubkey) -> u64 {
        self.pools.get(token).map(|p| p.balance).unwrap_or(0)
    }

    /// Shares owned by a provider
    pub fn provider_shares(&self, provider: &Pubkey, token: &Pubkey) -> u64 {
        *self.shares.get(&(*provider, *token)).unwrap_or(&0)
    }

    /// Tokens whose pool is halted
    pub fn halted_pools(&self) -> Vec<Pubkey> {
        let mut halted: Vec<Pubkey> = self
            .pools
            .values()
            .filter(|p| p.halted)
            .map(|p| p.token)
            .collect();
        halted.sort();
        halted
    }

    /// Deposit liquidity, returning the shares issued
    pub fn deposit(&mut self, provider: &Pubkey, token: &Pubkey, amount: u64, now: u64) -> BridgeResult<u64> {
        if amount == 0 {
            return Err(BridgeError::InvalidArgument("deposit amount must be positive".into()));
        }
        self.ensure_operational(token)?;

        let pool = self.pools.entry(*token).or_insert_with(|| LiquidityPoolState::new(*token));

        // A drained pool's outstanding shares are worthless
        if pool.balance == 0 && pool.total_shares > 0 {
            warn!(
                "Pool {} drained with {} shares outstanding, retiring them",
                token, pool.total_shares
            );
            pool.total_shares = 0;
            self.shares.retain(|(_, t), _| t != token);
        }

        let shares = if pool.total_shares == 0 {
            amount
        } else {
            let issued = (amount as u128) * (pool.total_shares as u128) / (pool.balance as u128);
            u64::try_from(issued).map_err(|_| BridgeError::Arithmetic("share overflow".into()))?
        };
        if shares == 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "deposit of {} too small to issue shares",
                amount
            )));
        }

        let balance = checked(pool.balance.checked_add(amount), "pool balance")?;
        let total_shares = checked(pool.total_shares.checked_add(shares), "total shares")?;
        let total_deposits = checked(pool.total_deposits.checked_add(amount), "total deposits")?;

        pool.balance = balance;
        pool.total_shares = total_shares;
        pool.total_deposits = total_deposits;
        pool.last_update = now;

        let owned = self.shares.entry((*provider, *token)).or_insert(0);
        *owned = owned.saturating_add(shares);

        info!(
            "Liquidity deposited: provider {}, token {}, amount {}, shares {}",
            provider, token, amount, shares
        );

        Ok(shares)
    }

    /// Redeem shares, returning the amount paid out
    pub fn withdraw(&mut self, provider: &Pubkey, token: &Pubkey, shares: u64, now: u64) -> BridgeResult<u64> {
        if shares == 0 {
            return Err(BridgeError::InvalidArgument("share amount must be positive".into()));
        }
        self.ensure_operational(token)?;

        let owned = self.provider_shares(provider, token);
        if owned < shares {
            return Err(BridgeError::InsufficientShares {
                requested: shares,
                owned,
            });
        }

        let pool = self
            .pools
            .get_mut(token)
            .ok_or_else(|| BridgeError::InvariantViolation(format!("shares without pool for {}", token)))?;

        let amount = pool.shares_to_amount(shares);
        let available = pool.available();
        if amount > available {
            return Err(BridgeError::InsufficientPoolLiquidity {
                token: *token,
                requested: amount,
                available,
            });
        }

        pool.balance -= amount;
        pool.total_shares -= shares;
        pool.total_withdrawals = pool.total_withdrawals.saturating_add(amount);
        pool.last_update = now;
        self.shares.insert((*provider, *token), owned - shares);

        info!(
            "Liquidity withdrawn: provider {}, token {}, shares {}, amount {}",
            provider, token, shares, amount
        );

        Ok(amount)
    }

    /// Check that a settlement of `amount` can be paid right now
    pub fn check_settlement(&self, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        let pool = self.pools.get(token);
        if let Some(pool) = pool {
            if pool.halted {
                return Err(BridgeError::PoolHalted(*token));
            }
            if !pool.is_consistent() {
                return Err(BridgeError::PoolHalted(*token));
            }
        }

        let available = pool.map(|p| p.balance).unwrap_or(0);
        if available < amount {
            return Err(BridgeError::InsufficientLiquidity {
                token: *token,
                required: amount,
                available,
            });
        }

        Ok(())
    }

    /// Debit the pool for a settlement and drop its reservation
    pub fn debit(&mut self, token: &Pubkey, amount: u64, now: u64) -> BridgeResult<()> {
        self.ensure_operational(token)?;
        self.check_settlement(token, amount)?;

        let pool = self
            .pools
            .get_mut(token)
            .ok_or(BridgeError::InsufficientLiquidity {
                token: *token,
                required: amount,
                available: 0,
            })?;

        pool.balance -= amount;
        pool.total_settled = pool.total_settled.saturating_add(amount);
        pool.reserved = pool.reserved.saturating_sub(amount);
        pool.last_update = now;

        debug!("Pool {} debited {}, balance {}", token, amount, pool.balance);

        Ok(())
    }

    /// Reserve liquidity for a validated transfer
    pub fn reserve(&mut self, token: &Pubkey, amount: u64) {
        let pool = self.pools.entry(*token).or_insert_with(|| LiquidityPoolState::new(*token));
        pool.reserved = pool.reserved.saturating_add(amount);

        debug!("Pool {} reserved {}, total reserved {}", token, amount, pool.reserved);
    }

    /// Drop a reservation for a transfer that will not settle
    pub fn release_reservation(&mut self, token: &Pubkey, amount: u64) {
        if let Some(pool) = self.pools.get_mut(token) {
            pool.reserved = pool.reserved.saturating_sub(amount);
        }
    }

    /// Clear the halt flag after manual intervention, rebasing the
    /// accounting on the current balance
    pub fn resume(&mut self, token: &Pubkey, now: u64) -> BridgeResult<()> {
        let pool = self
            .pools
            .get_mut(token)
            .ok_or(BridgeError::InvalidToken(*token))?;

        if !pool.is_consistent() {
            let expected = pool.total_deposits as i128
                - pool.total_withdrawals as i128
                - pool.total_settled as i128;
            warn!(
                "Pool {} rebased: balance {}, accounting expected {}",
                token, pool.balance, expected
            );
            let deposits = pool.balance as u128 + pool.total_withdrawals as u128 + pool.total_settled as u128;
            pool.total_deposits = checked(u64::try_from(deposits).ok(), "total deposits")?;
        }

        pool.halted = false;
        pool.last_update = now;

        info!("Pool {} resumed", token);

        Ok(())
    }

    /// Halt a pool, returning whether it was running
    pub fn halt(&mut self, token: &Pubkey) -> bool {
        match self.pools.get_mut(token) {
            Some(pool) if !pool.halted => {
                pool.halted = true;
                true
            }
            _ => false,
        }
    }

    /// Halt the pool if its accounting is broken
    fn ensure_operational(&mut self, token: &Pubkey) -> BridgeResult<()> {
        if let Some(pool) = self.pools.get_mut(token) {
            if pool.halted {
                return Err(BridgeError::PoolHalted(*token));
            }
            if !pool.is_consistent() {
                pool.halted = true;
                error!(
                    "Pool {} halted: balance {} does not match deposits {} - withdrawals {} - settled {}",
                    token, pool.balance, pool.total_deposits, pool.total_withdrawals, pool.total_settled
                );
                return Err(BridgeError::PoolHalted(*token));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool_mut(&mut self, token: &Pubkey) -> Option<&mut LiquidityPoolState> {
        self.pools.get_mut(token)
    }
}

fn checked(value: Option<u64>, what: &str) -> BridgeResult<u64> {
    value.ok_or_else(|| BridgeError::Arithmetic(format!("{} overflow", what)))
}
