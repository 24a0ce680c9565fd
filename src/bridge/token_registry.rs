// src/bridge/token_registry.rs
//! Token Registry for the bridge
//!
//! This module provides a registry for the assets that can be bridged,
//! their bridge mode and fee, and the optional daily volume cap.

use borsh::{BorshDeserialize, BorshSerialize};
use log::info;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::collections::HashMap;

use super::types::{BridgeMode, BPS_DENOMINATOR};
use crate::error_handling::{BridgeError, BridgeResult};
use crate::utils::day_index;

/// Token configuration
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Source-side token
    pub token: Pubkey,

    /// Token symbol
    pub symbol: String,

    /// Token decimals
    pub decimals: u8,

    /// How the destination side produces value
    pub mode: BridgeMode,

    /// Token-specific fee (in basis points)
    pub fee_bps: u32,

    /// Whether the token can be bridged
    pub is_active: bool,

    /// Destination asset, when it differs from the source token
    pub destination_token: Option<Pubkey>,

    /// Maximum volume bridged per UTC day
    pub daily_limit: Option<u64>,

    /// Registration timestamp
    pub registered_at: u64,
}

impl TokenConfig {
    /// Asset delivered on the destination side
    pub fn destination_asset(&self) -> Pubkey {
        self.destination_token.unwrap_or(self.token)
    }
}

/// Volume bridged during one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DailyVolume {
    /// Day index (unix time / 86400)
    pub day: u64,

    /// Volume bridged that day
    pub volume: u64,
}

/// Registry of bridgeable tokens
#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct TokenRegistry {
    tokens: HashMap<Pubkey, TokenConfig>,
    daily_volume: HashMap<Pubkey, DailyVolume>,
}

impl TokenRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token
    pub fn add_token(&mut self, config: TokenConfig) -> BridgeResult<()> {
        if self.tokens.contains_key(&config.token) {
            return Err(BridgeError::AlreadyExists(format!("token {}", config.token)));
        }
        if config.fee_bps as u64 > BPS_DENOMINATOR {
            return Err(BridgeError::InvalidArgument(format!(
                "token fee {} bps above {}",
                config.fee_bps, BPS_DENOMINATOR
            )));
        }

        info!(
            "Token registered: {} ({}), mode {:?}",
            config.token, config.symbol, config.mode
        );
        self.tokens.insert(config.token, config);

        Ok(())
    }

    /// Enable or disable a token
    pub fn set_token_active(&mut self, token: &Pubkey, active: bool) -> BridgeResult<()> {
        let config = self
            .tokens
            .get_mut(token)
            .ok_or(BridgeError::InvalidToken(*token))?;
        config.is_active = active;

        info!("Token {} active: {}", token, active);

        Ok(())
    }

    /// Check if a token can be bridged
    pub fn is_token_active(&self, token: &Pubkey) -> bool {
        self.tokens.get(token).map(|t| t.is_active).unwrap_or(false)
    }

    /// Get a token
    pub fn get_token(&self, token: &Pubkey) -> Option<&TokenConfig> {
        self.tokens.get(token)
    }

    /// Bridge mode of a token
    pub fn bridge_mode(&self, token: &Pubkey) -> BridgeResult<BridgeMode> {
        self.tokens
            .get(token)
            .map(|t| t.mode)
            .ok_or(BridgeError::InvalidToken(*token))
    }

    /// Token-specific fee rate (in basis points)
    pub fn fee_rate(&self, token: &Pubkey) -> BridgeResult<u32> {
        self.tokens
            .get(token)
            .map(|t| t.fee_bps)
            .ok_or(BridgeError::InvalidToken(*token))
    }

    /// Volume already bridged today
    pub fn volume_today(&self, token: &Pubkey, now: u64) -> u64 {
        match self.daily_volume.get(token) {
            Some(v) if v.day == day_index(now) => v.volume,
            _ => 0,
        }
    }

    /// Check the daily cap without recording anything
    pub fn check_daily_limit(&self, token: &Pubkey, amount: u64, now: u64) -> BridgeResult<()> {
        let config = self.tokens.get(token).ok_or(BridgeError::InvalidToken(*token))?;

        if let Some(limit) = config.daily_limit {
            let used = self.volume_today(token, now);
            if used.saturating_add(amount) > limit {
                return Err(BridgeError::DailyLimitExceeded {
                    token: *token,
                    limit,
                    used,
                    requested: amount,
                });
            }
        }

        Ok(())
    }

    /// Add `amount` to today's volume
    pub fn record_volume(&mut self, token: &Pubkey, amount: u64, now: u64) {
        let day = day_index(now);
        let entry = self.daily_volume.entry(*token).or_default();
        if entry.day != day {
            *entry = DailyVolume { day, volume: 0 };
        }
        entry.volume = entry.volume.saturating_add(amount);
    }
}
