// src/bridge/chain_registry.rs
//! Chain Registry for the bridge
//!
//! Holds the configuration of every destination ledger the bridge can
//! send to. Transfers are only accepted towards active chains.

use borsh::{BorshDeserialize, BorshSerialize};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{ChainId, BPS_DENOMINATOR};
use crate::error_handling::{BridgeError, BridgeResult};

/// Chain configuration
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier
    pub chain_id: ChainId,

    /// Human readable name
    pub name: String,

    /// Chain-specific fee (in basis points)
    pub fee_bps: u32,

    /// Whether transfers towards this chain are accepted
    pub is_active: bool,

    /// Source-side confirmations relayers wait for before attesting
    pub required_confirmations: u32,

    /// Registration timestamp
    pub registered_at: u64,
}

/// Registry of destination chains
#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct ChainRegistry {
    chains: HashMap<ChainId, ChainConfig>,
}

impl ChainRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chain
    pub fn add_chain(&mut self, config: ChainConfig) -> BridgeResult<()> {
        if self.chains.contains_key(&config.chain_id) {
            return Err(BridgeError::AlreadyExists(format!("chain {}", config.chain_id)));
        }
        if config.fee_bps as u64 > BPS_DENOMINATOR {
            return Err(BridgeError::InvalidArgument(format!(
                "chain fee {} bps above {}",
                config.fee_bps, BPS_DENOMINATOR
            )));
        }

        info!("Chain registered: {} ({})", config.chain_id, config.name);
        self.chains.insert(config.chain_id, config);

        Ok(())
    }

    /// Enable or disable a chain
    pub fn set_chain_active(&mut self, chain_id: ChainId, active: bool) -> BridgeResult<()> {
        let chain = self
            .chains
            .get_mut(&chain_id)
            .ok_or(BridgeError::InvalidChain(chain_id))?;
        chain.is_active = active;

        info!("Chain {} active: {}", chain_id, active);

        Ok(())
    }

    /// Check if a chain accepts transfers
    pub fn is_chain_active(&self, chain_id: ChainId) -> bool {
        self.chains.get(&chain_id).map(|c| c.is_active).unwrap_or(false)
    }

    /// Chain-specific fee rate (in basis points)
    pub fn fee_rate(&self, chain_id: ChainId) -> BridgeResult<u32> {
        self.chains
            .get(&chain_id)
            .map(|c| c.fee_bps)
            .ok_or(BridgeError::InvalidChain(chain_id))
    }

    /// Number of active chains
    pub fn active_count(&self) -> usize {
        self.chains.values().filter(|c| c.is_active).count()
    }

    /// Number of registered chains
    pub fn total_count(&self) -> usize {
        self.chains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(chain_id: ChainId) -> ChainConfig {
        ChainConfig {
            chain_id,
            name: format!("chain-{}", chain_id),
            fee_bps: 50,
            is_active: true,
            required_confirmations: 12,
            registered_at: 0,
        }
    }

    #[test]
    fn test_chain_registry() {
        let mut registry = ChainRegistry::new();
        registry.add_chain(chain(2)).unwrap();
        registry.add_chain(chain(3)).unwrap();

        assert!(registry.is_chain_active(2));
        assert!(!registry.is_chain_active(4));
        assert_eq!(registry.fee_rate(2).unwrap(), 50);
        assert_eq!(registry.fee_rate(4), Err(BridgeError::InvalidChain(4)));

        registry.set_chain_active(3, false).unwrap();
        assert!(!registry.is_chain_active(3));
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.total_count(), 2);
    }

    #[test]
    fn test_duplicate_chain_rejected() {
        let mut registry = ChainRegistry::new();
        registry.add_chain(chain(2)).unwrap();
        assert!(matches!(registry.add_chain(chain(2)), Err(BridgeError::AlreadyExists(_))));
    }
}
