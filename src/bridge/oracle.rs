// src/bridge/oracle.rs
//! Conversion rates for cross-asset transfers
//!
//! The bridge treats the oracle's rate as opaque; how prices are
//! aggregated is the oracle's concern.

use solana_program::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error_handling::{BridgeError, BridgeResult};

/// Fixed-point precision of conversion rates
pub const RATE_PRECISION: u64 = 1_000_000_000;

/// Source of conversion rates
pub trait ConversionOracle: Send + Sync {
    /// Destination units per source unit, scaled by `RATE_PRECISION`
    fn conversion_rate(&self, from: &Pubkey, to: &Pubkey) -> Option<u64>;
}

/// Convert `amount` with a `RATE_PRECISION`-scaled rate, rounding down
pub fn convert(amount: u64, rate: u64) -> BridgeResult<u64> {
    let converted = (amount as u128) * (rate as u128) / (RATE_PRECISION as u128);
    u64::try_from(converted).map_err(|_| BridgeError::Arithmetic(format!("conversion of {} overflows", amount)))
}

/// Oracle serving rates set by an operator
#[derive(Debug, Default)]
pub struct FixedRateOracle {
    rates: RwLock<HashMap<(Pubkey, Pubkey), u64>>,
}

impl FixedRateOracle {
    /// Create an oracle without rates
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rate for a pair
    pub fn set_rate(&self, from: Pubkey, to: Pubkey, rate: u64) -> BridgeResult<()> {
        if rate == 0 {
            return Err(BridgeError::InvalidArgument("conversion rate must be positive".into()));
        }
        let mut rates = self
            .rates
            .write()
            .map_err(|_| BridgeError::Internal("oracle rate table poisoned".into()))?;
        rates.insert((from, to), rate);
        Ok(())
    }
}

impl ConversionOracle for FixedRateOracle {
    fn conversion_rate(&self, from: &Pubkey, to: &Pubkey) -> Option<u64> {
        if from == to {
            return Some(RATE_PRECISION);
        }
        self.rates.read().ok()?.get(&(*from, *to)).copied()
    }
}
