// src/bridge/config.rs
//! Bridge configuration

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::path::Path;

use super::types::{ChainId, BPS_DENOMINATOR};
use crate::error_handling::{BridgeError, BridgeResult};

/// Bridge configuration
#[derive(BorshSerialize, BorshDeserialize, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Administrative authority
    #[serde(with = "pubkey_string")]
    pub authority: Pubkey,

    /// Challenge resolution authority
    #[serde(with = "pubkey_string")]
    pub resolver: Pubkey,

    /// Chain this engine instance runs on
    pub local_chain_id: ChainId,

    /// Base fee charged on every transfer (in basis points)
    pub base_fee_bps: u32,

    /// Minimum transfer amount
    pub min_amount: u64,

    /// Maximum transfer amount
    pub max_amount: u64,

    /// Minimum attestations before the tally is evaluated
    pub quorum: u32,

    /// Share of valid attestations required (in basis points)
    pub approval_threshold_bps: u32,

    /// Challenge period (in seconds)
    pub challenge_period: u64,

    /// Active validators that must remain registered
    pub min_active_validators: u32,

    /// Stake below which a slashed validator is deactivated
    pub min_validator_stake: u64,

    /// Share of the fee paid to attesting validators (in basis points);
    /// the rest goes to the relayer
    pub validator_reward_bps: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            authority: Pubkey::default(),
            resolver: Pubkey::default(),
            local_chain_id: 1,
            base_fee_bps: 10, // 0.1%
            min_amount: 1,
            max_amount: 1_000_000_000_000_000,
            quorum: 3,
            approval_threshold_bps: 6_700, // 67%
            challenge_period: 3_600, // 1 hour in seconds
            min_active_validators: 3,
            min_validator_stake: 0,
            validator_reward_bps: 7_000, // 70%
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> BridgeResult<Self> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> BridgeResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that the settings are consistent
    pub fn validate(&self) -> BridgeResult<()> {
        let bps = BPS_DENOMINATOR as u32;

        if self.quorum == 0 {
            return Err(BridgeError::InvalidConfig("quorum must be positive".into()));
        }
        if self.approval_threshold_bps == 0 || self.approval_threshold_bps > bps {
            return Err(BridgeError::InvalidConfig(format!(
                "approval threshold {} bps outside (0, {}]",
                self.approval_threshold_bps, bps
            )));
        }
        if self.validator_reward_bps > bps {
            return Err(BridgeError::InvalidConfig(format!(
                "validator reward {} bps above {}",
                self.validator_reward_bps, bps
            )));
        }
        if self.base_fee_bps > bps {
            return Err(BridgeError::InvalidConfig(format!(
                "base fee {} bps above {}",
                self.base_fee_bps, bps
            )));
        }
        if self.min_amount > self.max_amount {
            return Err(BridgeError::InvalidConfig(format!(
                "min amount {} above max amount {}",
                self.min_amount, self.max_amount
            )));
        }

        Ok(())
    }
}

/// Pubkeys as base58 strings
mod pubkey_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_program::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(|e| D::Error::custom(format!("invalid pubkey {}: {}", s, e)))
    }
}
