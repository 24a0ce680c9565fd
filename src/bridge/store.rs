// src/bridge/store.rs
//! Durable bridge state
//!
//! The whole `BridgeState` is written as one borsh snapshot. A snapshot
//! is written to a temporary file, synced, then renamed over the previous
//! one, so a crash leaves either the old or the new state on disk.

use borsh::{BorshDeserialize, BorshSerialize};
use log::{debug, info};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::BridgeState;
use crate::error_handling::{BridgeError, BridgeResult};

/// Snapshot file header
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"L2BRIDG1";

/// File-backed snapshot store
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store snapshots at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot, if any
    pub fn load(&self) -> BridgeResult<Option<BridgeState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path)?;
        let body = bytes
            .strip_prefix(SNAPSHOT_MAGIC.as_slice())
            .ok_or_else(|| BridgeError::Storage(format!("{} is not a bridge snapshot", self.path.display())))?;
        let state = BridgeState::try_from_slice(body)
            .map_err(|e| BridgeError::Serialization(format!("corrupt snapshot: {}", e)))?;

        info!("Bridge state restored from {}", self.path.display());

        Ok(Some(state))
    }

    /// Atomically replace the snapshot with `state`
    pub fn save(&self, state: &BridgeState) -> BridgeResult<()> {
        let body = state
            .try_to_vec()
            .map_err(|e| BridgeError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(SNAPSHOT_MAGIC)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!("Snapshot written: {} bytes to {}", body.len(), self.path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeConfig;
    use solana_program::pubkey::Pubkey;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.snapshot", name, Pubkey::new_unique()))
    }

    #[test]
    fn test_missing_snapshot_loads_none() {
        let store = SnapshotStore::new(temp_path("missing"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let store = SnapshotStore::new(&path);

        let mut state = BridgeState::new(BridgeConfig::default());
        state.paused = true;
        state.ledger.credit(&Pubkey::new_unique(), &Pubkey::new_unique(), 42).unwrap();
        store.save(&state).unwrap();

        let restored = store.load().unwrap().unwrap();
        assert!(restored.paused);
        assert_eq!(restored.config, state.config);
        assert!(!path.with_extension("tmp").exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_foreign_file_rejected() {
        let path = temp_path("foreign");
        fs::write(&path, b"not a snapshot").unwrap();

        let store = SnapshotStore::new(&path);
        assert!(matches!(store.load(), Err(BridgeError::Storage(_))));

        fs::remove_file(&path).unwrap();
    }
}
