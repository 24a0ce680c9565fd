// src/bridge/challenge_engine.rs
//! Challenge Engine for the bridge
//!
//! Any party may dispute a VALIDATED transaction while its challenge
//! window is open. The resolution authority then either upholds the
//! challenge (FAILED, sender refunded) or denies it (back to VALIDATED).
//!
//! A denied challenge keeps the original validation timestamp, so the
//! window is never extended and re-challenges are only possible within it.

use log::{info, warn};
use solana_program::pubkey::Pubkey;

use super::ledger::Ledger;
use super::liquidity_pool::LiquidityPool;
use super::token_registry::TokenRegistry;
use super::transaction_store::TransactionStore;
use super::transfer_engine::close_with_refund;
use super::types::{
    BridgeMode, ChallengeRecord, ChallengeResolution, TransactionId, TransactionStatus,
};
use super::validator_registry::ValidatorRegistry;
use crate::error_handling::{BridgeError, BridgeResult};

/// Challenge settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeConfig {
    /// Challenge period (in seconds)
    pub challenge_period: u64,

    /// Only account allowed to resolve challenges
    pub resolver: Pubkey,
}

/// Dispute handling
#[derive(Debug, Clone)]
pub struct ChallengeEngine {
    config: ChallengeConfig,
}

impl ChallengeEngine {
    /// Create a challenge engine with the specified configuration
    pub fn with_config(config: ChallengeConfig) -> Self {
        Self { config }
    }

    /// End of the challenge window for a validation timestamp
    pub fn window_end(&self, validated_at: u64) -> BridgeResult<u64> {
        validated_at
            .checked_add(self.config.challenge_period)
            .ok_or_else(|| BridgeError::Arithmetic("challenge window overflow".into()))
    }

    /// Dispute a VALIDATED transaction
    pub fn challenge(
        &self,
        id: &TransactionId,
        challenger: &Pubkey,
        reason: &str,
        evidence: Vec<u8>,
        store: &mut TransactionStore,
        now: u64,
    ) -> BridgeResult<()> {
        if reason.trim().is_empty() {
            return Err(BridgeError::InvalidArgument("challenge reason must not be empty".into()));
        }

        let transaction = store.require(id)?;
        transaction.ensure_status(TransactionStatus::Validated)?;
        let validated_at = transaction.validated_at.ok_or_else(|| {
            BridgeError::InvariantViolation(format!("validated transaction {} has no timestamp", id))
        })?;

        let ended_at = self.window_end(validated_at)?;
        if now >= ended_at {
            return Err(BridgeError::ChallengePeriodExpired { ended_at });
        }

        let transaction = store.require_mut(id)?;
        transaction.transition(TransactionStatus::Challenged)?;
        transaction.challenges.push(ChallengeRecord {
            challenger: *challenger,
            reason: reason.to_string(),
            evidence,
            challenged_at: now,
            resolution: None,
        });

        warn!("Transaction challenged: {} by {}, reason: {}", id, challenger, reason);

        Ok(())
    }

    /// Decide the current challenge of a transaction, returning its new status
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_challenge(
        &self,
        id: &TransactionId,
        caller: &Pubkey,
        uphold: bool,
        note: &str,
        store: &mut TransactionStore,
        tokens: &TokenRegistry,
        ledger: &mut Ledger,
        pools: &mut LiquidityPool,
        validators: &mut ValidatorRegistry,
        now: u64,
    ) -> BridgeResult<TransactionStatus> {
        if *caller != self.config.resolver {
            return Err(BridgeError::Unauthorized(*caller));
        }

        let transaction = store.require(id)?;
        transaction.ensure_status(TransactionStatus::Challenged)?;
        let token = transaction.token;
        let reserved = transaction.delivered_amount.unwrap_or(transaction.amount);

        let resolution = ChallengeResolution {
            resolver: *caller,
            upheld: uphold,
            note: note.to_string(),
            resolved_at: now,
        };

        if !uphold {
            let transaction = store.require_mut(id)?;
            transaction.transition(TransactionStatus::Validated)?;
            if let Some(challenge) = transaction.challenges.last_mut() {
                challenge.resolution = Some(resolution);
            }

            info!("Challenge denied: {}, note: {}", id, note);

            return Ok(TransactionStatus::Validated);
        }

        close_with_refund(id, TransactionStatus::Failed, store, ledger, now)?;

        if let Some(config) = tokens.get_token(&token) {
            if config.mode == BridgeMode::LiquidityPool {
                pools.release_reservation(&config.destination_asset(), reserved);
            }
        }

        // Attesters who called it valid were wrong
        for attestation in store.attestations(id) {
            validators.record_outcome(&attestation.validator, !attestation.is_valid);
        }

        let transaction = store.require_mut(id)?;
        if let Some(challenge) = transaction.challenges.last_mut() {
            challenge.resolution = Some(resolution);
        }

        info!("Challenge upheld: {}, note: {}", id, note);

        Ok(TransactionStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::token_registry::TokenConfig;
    use crate::bridge::transaction_store::derive_transaction_id;
    use crate::bridge::types::{Attestation, BridgeTransaction};
    use crate::bridge::validator_registry::ValidatorSetConfig;

    struct Fixture {
        engine: ChallengeEngine,
        store: TransactionStore,
        tokens: TokenRegistry,
        ledger: Ledger,
        pools: LiquidityPool,
        validators: ValidatorRegistry,
        resolver: Pubkey,
        attesters: Vec<Pubkey>,
        id: TransactionId,
    }

    /// A pool-mode transaction validated at t=100 by two valid and one
    /// invalid attestation
    fn fixture() -> Fixture {
        let resolver = Pubkey::new_unique();
        let engine = ChallengeEngine::with_config(ChallengeConfig {
            challenge_period: 50,
            resolver,
        });

        let token = Pubkey::new_unique();
        let mut tokens = TokenRegistry::new();
        tokens
            .add_token(TokenConfig {
                token,
                symbol: "X".to_string(),
                decimals: 6,
                mode: BridgeMode::LiquidityPool,
                fee_bps: 0,
                is_active: true,
                destination_token: None,
                daily_limit: None,
                registered_at: 0,
            })
            .unwrap();

        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let mut ledger = Ledger::new();
        ledger.credit(&sender, &token, 101).unwrap();
        ledger.lock(&sender, &token, 101).unwrap();

        let mut pools = LiquidityPool::new();
        pools.deposit(&Pubkey::new_unique(), &token, 1_000, 0).unwrap();
        pools.reserve(&token, 100);

        let mut validators = ValidatorRegistry::with_config(ValidatorSetConfig {
            min_active_validators: 1,
            min_validator_stake: 0,
        });
        let attesters: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        for v in &attesters {
            validators.add_validator(*v, 100, 0).unwrap();
        }

        let id = derive_transaction_id(&sender, &token, 100, 2, &recipient, 0, 0).unwrap();
        let mut store = TransactionStore::new();
        store
            .insert(BridgeTransaction {
                id,
                source_chain: 1,
                destination_chain: 2,
                token,
                amount: 100,
                sender,
                recipient,
                fee: 1,
                created_at: 0,
                validated_at: Some(100),
                executed_at: None,
                closed_at: None,
                status: TransactionStatus::Validated,
                valid_votes: 2,
                invalid_votes: 1,
                challenges: Vec::new(),
                relayer: None,
                delivered_amount: Some(100),
            })
            .unwrap();
        for (i, v) in attesters.iter().enumerate() {
            store
                .add_attestation(Attestation {
                    transaction_id: id,
                    validator: *v,
                    is_valid: i < 2,
                    nonce: 0,
                    timestamp: 100,
                    proof: Vec::new(),
                })
                .unwrap();
        }

        Fixture {
            engine,
            store,
            tokens,
            ledger,
            pools,
            validators,
            resolver,
            attesters,
            id,
        }
    }

    fn resolve(f: &mut Fixture, caller: Pubkey, uphold: bool, now: u64) -> BridgeResult<TransactionStatus> {
        f.engine.resolve_challenge(
            &f.id,
            &caller,
            uphold,
            "reviewed",
            &mut f.store,
            &f.tokens,
            &mut f.ledger,
            &mut f.pools,
            &mut f.validators,
            now,
        )
    }

    #[test]
    fn test_challenge_window_boundary() {
        let mut f = fixture();
        let challenger = Pubkey::new_unique();

        assert_eq!(
            f.engine.challenge(&f.id, &challenger, "forged proof", vec![1], &mut f.store, 150),
            Err(BridgeError::ChallengePeriodExpired { ended_at: 150 })
        );
        f.engine
            .challenge(&f.id, &challenger, "forged proof", vec![1], &mut f.store, 149)
            .unwrap();

        let tx = f.store.get(&f.id).unwrap();
        assert_eq!(tx.status, TransactionStatus::Challenged);
        assert_eq!(tx.current_challenge().unwrap().challenger, challenger);
        assert_eq!(tx.current_challenge().unwrap().evidence, vec![1]);
    }

    #[test]
    fn test_challenge_requires_reason_and_validated_status() {
        let mut f = fixture();
        let challenger = Pubkey::new_unique();

        assert!(matches!(
            f.engine.challenge(&f.id, &challenger, "  ", vec![], &mut f.store, 120),
            Err(BridgeError::InvalidArgument(_))
        ));

        f.engine.challenge(&f.id, &challenger, "bad", vec![], &mut f.store, 120).unwrap();
        assert!(matches!(
            f.engine.challenge(&f.id, &challenger, "again", vec![], &mut f.store, 121),
            Err(BridgeError::InvalidStatus { .. })
        ));
    }

    #[test]
    fn test_only_resolver_resolves() {
        let mut f = fixture();
        f.engine
            .challenge(&f.id, &Pubkey::new_unique(), "bad", vec![], &mut f.store, 120)
            .unwrap();

        let stranger = Pubkey::new_unique();
        assert_eq!(resolve(&mut f, stranger, true, 130), Err(BridgeError::Unauthorized(stranger)));
        assert_eq!(f.store.get(&f.id).unwrap().status, TransactionStatus::Challenged);
    }

    #[test]
    fn test_upheld_challenge_refunds_and_scores() {
        let mut f = fixture();
        f.engine
            .challenge(&f.id, &Pubkey::new_unique(), "bad", vec![], &mut f.store, 120)
            .unwrap();

        let resolver = f.resolver;
        assert_eq!(resolve(&mut f, resolver, true, 130).unwrap(), TransactionStatus::Failed);

        let tx = f.store.get(&f.id).unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.closed_at, Some(130));
        assert!(tx.current_challenge().unwrap().resolution.as_ref().unwrap().upheld);
        assert_eq!(f.ledger.balance(&tx.sender, &tx.token), 101);
        assert_eq!(f.ledger.escrowed(&tx.token), 0);
        assert_eq!(f.pools.get_pool(&tx.token).unwrap().reserved, 0);
        assert_eq!(f.pools.balance(&tx.token), 1_000);

        assert_eq!(f.validators.get_validator(&f.attesters[0]).unwrap().accuracy_bps(), 0);
        assert_eq!(f.validators.get_validator(&f.attesters[2]).unwrap().accuracy_bps(), 10_000);
        assert_eq!(f.validators.get_validator(&f.attesters[2]).unwrap().scored_attestations, 1);
    }

    #[test]
    fn test_denied_challenge_keeps_window() {
        let mut f = fixture();
        let challenger = Pubkey::new_unique();
        f.engine.challenge(&f.id, &challenger, "bad", vec![], &mut f.store, 120).unwrap();

        let resolver = f.resolver;
        assert_eq!(resolve(&mut f, resolver, false, 130).unwrap(), TransactionStatus::Validated);

        let tx = f.store.get(&f.id).unwrap();
        assert_eq!(tx.validated_at, Some(100));
        assert!(!tx.current_challenge().unwrap().resolution.as_ref().unwrap().upheld);
        assert_eq!(f.pools.get_pool(&tx.token).unwrap().reserved, 100);

        // Re-challenge within the original window, not after it
        f.engine.challenge(&f.id, &challenger, "new evidence", vec![], &mut f.store, 140).unwrap();
        assert_eq!(resolve(&mut f, resolver, false, 145).unwrap(), TransactionStatus::Validated);
        assert!(matches!(
            f.engine.challenge(&f.id, &challenger, "late", vec![], &mut f.store, 150),
            Err(BridgeError::ChallengePeriodExpired { .. })
        ));
        assert_eq!(f.store.get(&f.id).unwrap().challenges.len(), 2);
    }
}
