// src/bridge/mod.rs
//! Bridge module for Layer-2 on Solana
//!
//! This module moves assets between the Layer-2 and other chains through a
//! permissioned validator set. A transfer goes through four stages:
//! - TransferEngine: request validation, fee, escrow (PENDING)
//! - ConsensusEngine: validator attestations (VALIDATED or REJECTED)
//! - ChallengeEngine: disputes during the challenge window (FAILED)
//! - SettlementEngine: delivery and fee distribution (EXECUTED)
//!
//! `BridgeEngine` composes the stages over a single `BridgeState` and runs
//! every operation as one atomic unit. `SharedBridge` serializes access
//! across threads.

pub mod attestation;
pub mod chain_registry;
pub mod challenge_engine;
pub mod config;
pub mod consensus_engine;
pub mod ledger;
pub mod liquidity_pool;
pub mod oracle;
pub mod settlement_engine;
pub mod store;
pub mod token_registry;
pub mod transaction_store;
pub mod transfer_engine;
pub mod types;
pub mod validator_registry;

pub use attestation::{attestation_digest, sign_attestation, AttestationVerifier, Ed25519AttestationVerifier};
pub use chain_registry::{ChainConfig, ChainRegistry};
pub use challenge_engine::{ChallengeConfig, ChallengeEngine};
pub use config::BridgeConfig;
pub use consensus_engine::{AttestationOutcome, ConsensusConfig, ConsensusEngine};
pub use ledger::Ledger;
pub use liquidity_pool::{LiquidityPool, LiquidityPoolState};
pub use oracle::{ConversionOracle, FixedRateOracle, RATE_PRECISION};
pub use settlement_engine::{FeeDistribution, SettlementConfig, SettlementEngine};
pub use store::SnapshotStore;
pub use token_registry::{TokenConfig, TokenRegistry};
pub use transaction_store::TransactionStore;
pub use transfer_engine::{FeeQuote, TransferConfig, TransferEngine, TransferRequest};
pub use types::{
    Attestation, BridgeMode, BridgeTransaction, ChainId, ChallengeRecord, ChallengeResolution,
    TransactionId, TransactionStatus,
};
pub use validator_registry::{ValidatorInfo, ValidatorRegistry, ValidatorSetConfig};

use borsh::{BorshDeserialize, BorshSerialize};
use log::{error, info, warn};
use solana_program::pubkey::Pubkey;
use std::sync::{Arc, RwLock};

use crate::error_handling::{BridgeError, BridgeResult};
use crate::monitoring::{HealthMonitor, HealthReport};
use crate::utils::Clock;

/// Everything the bridge must keep across restarts
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct BridgeState {
    pub config: BridgeConfig,
    pub chains: ChainRegistry,
    pub tokens: TokenRegistry,
    pub ledger: Ledger,
    pub pools: LiquidityPool,
    pub validators: ValidatorRegistry,
    pub transactions: TransactionStore,
    /// Emergency pause flag
    pub paused: bool,
}

impl BridgeState {
    /// Empty state for a configuration
    pub fn new(config: BridgeConfig) -> Self {
        let validators = ValidatorRegistry::with_config(validator_set_config(&config));
        Self {
            config,
            chains: ChainRegistry::new(),
            tokens: TokenRegistry::new(),
            ledger: Ledger::new(),
            pools: LiquidityPool::new(),
            validators,
            transactions: TransactionStore::new(),
            paused: false,
        }
    }
}

fn validator_set_config(config: &BridgeConfig) -> ValidatorSetConfig {
    ValidatorSetConfig {
        min_active_validators: config.min_active_validators,
        min_validator_stake: config.min_validator_stake,
    }
}

/// The bridge: state, stage engines and the capabilities they rely on
pub struct BridgeEngine {
    state: BridgeState,
    transfers: TransferEngine,
    consensus: ConsensusEngine,
    challenges: ChallengeEngine,
    settlement: SettlementEngine,
    monitor: HealthMonitor,
    clock: Box<dyn Clock>,
    verifier: Box<dyn AttestationVerifier>,
    oracle: Option<Arc<dyn ConversionOracle>>,
    store: Option<SnapshotStore>,
    /// Set after a fatal error; every later operation is refused
    halted: bool,
}

impl BridgeEngine {
    /// Create an in-memory bridge
    pub fn new(
        config: BridgeConfig,
        clock: Box<dyn Clock>,
        verifier: Box<dyn AttestationVerifier>,
    ) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self::from_state(BridgeState::new(config), clock, verifier))
    }

    /// Open a durable bridge, restoring the last snapshot in `store` if
    /// there is one. A fresh bridge starts from `config`.
    pub fn open(
        config: BridgeConfig,
        clock: Box<dyn Clock>,
        verifier: Box<dyn AttestationVerifier>,
        store: SnapshotStore,
    ) -> BridgeResult<Self> {
        config.validate()?;

        let state = match store.load()? {
            Some(state) => {
                if state.config != config {
                    warn!("Snapshot configuration differs from the supplied one; keeping the snapshot's");
                }
                state
            }
            None => {
                let state = BridgeState::new(config);
                store.save(&state)?;
                state
            }
        };

        let mut engine = Self::from_state(state, clock, verifier);
        engine.store = Some(store);
        Ok(engine)
    }

    /// Attach a conversion oracle for cross-asset tokens
    pub fn with_oracle(mut self, oracle: Arc<dyn ConversionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    fn from_state(
        state: BridgeState,
        clock: Box<dyn Clock>,
        verifier: Box<dyn AttestationVerifier>,
    ) -> Self {
        let config = &state.config;
        let transfers = TransferEngine::with_config(TransferConfig {
            local_chain_id: config.local_chain_id,
            base_fee_bps: config.base_fee_bps,
            min_amount: config.min_amount,
            max_amount: config.max_amount,
        });
        let consensus = ConsensusEngine::with_config(ConsensusConfig {
            quorum: config.quorum,
            approval_threshold_bps: config.approval_threshold_bps,
        });
        let challenges = ChallengeEngine::with_config(ChallengeConfig {
            challenge_period: config.challenge_period,
            resolver: config.resolver,
        });
        let settlement = SettlementEngine::with_config(SettlementConfig {
            challenge_period: config.challenge_period,
            validator_reward_bps: config.validator_reward_bps,
        });

        Self {
            state,
            transfers,
            consensus,
            challenges,
            settlement,
            monitor: HealthMonitor::new(),
            clock,
            verifier,
            oracle: None,
            store: None,
            halted: false,
        }
    }

    // Administration

    /// Register a destination chain
    pub fn add_chain(&mut self, caller: &Pubkey, mut chain: ChainConfig) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        chain.registered_at = self.clock.now();
        self.atomically("add_chain", |engine| engine.state.chains.add_chain(chain))
    }

    /// Enable or disable a chain
    pub fn set_chain_active(&mut self, caller: &Pubkey, chain_id: ChainId, active: bool) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        self.atomically("set_chain_active", |engine| {
            engine.state.chains.set_chain_active(chain_id, active)
        })
    }

    /// Register a token
    pub fn add_token(&mut self, caller: &Pubkey, mut token: TokenConfig) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        token.registered_at = self.clock.now();
        self.atomically("add_token", |engine| engine.state.tokens.add_token(token))
    }

    /// Enable or disable a token
    pub fn set_token_active(&mut self, caller: &Pubkey, token: &Pubkey, active: bool) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        self.atomically("set_token_active", |engine| {
            engine.state.tokens.set_token_active(token, active)
        })
    }

    /// Admit a validator
    pub fn add_validator(&mut self, caller: &Pubkey, validator: Pubkey, stake: u64) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        let now = self.clock.now();
        self.atomically("add_validator", |engine| {
            engine.state.validators.add_validator(validator, stake, now)
        })
    }

    /// Remove a validator
    pub fn remove_validator(&mut self, caller: &Pubkey, validator: &Pubkey) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        let now = self.clock.now();
        self.atomically("remove_validator", |engine| {
            engine.state.validators.remove_validator(validator, now)
        })
    }

    /// Slash a validator's stake, returning the amount slashed
    pub fn slash_validator(
        &mut self,
        caller: &Pubkey,
        validator: &Pubkey,
        slash_bps: u32,
        reason: &str,
    ) -> BridgeResult<u64> {
        self.ensure_authority(caller)?;
        let now = self.clock.now();
        self.atomically("slash_validator", |engine| {
            engine.state.validators.slash_validator(validator, slash_bps, reason, now)
        })
    }

    /// Stop intake and settlement
    pub fn pause(&mut self, caller: &Pubkey) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        self.atomically("pause", |engine| {
            engine.state.paused = true;
            warn!("Bridge paused by {}", caller);
            Ok(())
        })
    }

    /// Resume after a pause
    pub fn unpause(&mut self, caller: &Pubkey) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        self.atomically("unpause", |engine| {
            engine.state.paused = false;
            info!("Bridge unpaused by {}", caller);
            Ok(())
        })
    }

    /// Clear a halted pool after manual intervention
    pub fn resume_pool(&mut self, caller: &Pubkey, token: &Pubkey) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        let now = self.clock.now();
        self.atomically("resume_pool", |engine| engine.state.pools.resume(token, now))
    }

    /// Credit source-side funds to an account
    pub fn fund_account(&mut self, caller: &Pubkey, account: &Pubkey, token: &Pubkey, amount: u64) -> BridgeResult<()> {
        self.ensure_authority(caller)?;
        self.atomically("fund_account", |engine| {
            engine.state.ledger.credit(account, token, amount)
        })
    }

    // Transfers

    /// Fee for a transfer of `amount`
    pub fn quote_fee(&self, token: &Pubkey, destination_chain: ChainId, amount: u64) -> BridgeResult<FeeQuote> {
        self.transfers
            .quote_fee(&self.state.chains, &self.state.tokens, token, destination_chain, amount)
    }

    /// Start a transfer; the sender's funds are escrowed
    pub fn initiate_transfer(&mut self, request: &TransferRequest) -> BridgeResult<TransactionId> {
        self.ensure_running()?;
        let now = self.clock.now();
        self.atomically("initiate_transfer", |engine| {
            let state = &mut engine.state;
            engine.transfers.initiate(
                request,
                &state.chains,
                &mut state.tokens,
                &mut state.ledger,
                &mut state.transactions,
                now,
            )
        })
    }

    /// Cancel a PENDING transfer on behalf of its sender
    pub fn cancel_transfer(&mut self, caller: &Pubkey, id: &TransactionId) -> BridgeResult<()> {
        self.ensure_operational()?;
        let now = self.clock.now();
        self.atomically("cancel_transfer", |engine| {
            let state = &mut engine.state;
            engine
                .transfers
                .cancel(id, caller, &mut state.transactions, &mut state.ledger, now)
        })
    }

    // Consensus

    /// Count a validator's signed judgment on a PENDING transaction
    pub fn submit_attestation(
        &mut self,
        validator: &Pubkey,
        id: &TransactionId,
        is_valid: bool,
        proof: Vec<u8>,
    ) -> BridgeResult<AttestationOutcome> {
        self.ensure_running()?;
        let now = self.clock.now();
        self.atomically("submit_attestation", |engine| {
            let state = &mut engine.state;
            let tokens = &state.tokens;
            let oracle = engine.oracle.as_deref();

            let outcome = engine.consensus.submit_attestation(
                id,
                validator,
                is_valid,
                proof,
                &mut state.transactions,
                &mut state.validators,
                &mut state.ledger,
                &*engine.verifier,
                |tx| delivered_amount(tokens, oracle, tx),
                now,
            )?;

            if outcome == AttestationOutcome::Validated {
                engine.reserve_liquidity(id)?;
            }
            Ok(outcome)
        })
    }

    // Disputes

    /// Dispute a VALIDATED transaction within its challenge window
    pub fn challenge(
        &mut self,
        challenger: &Pubkey,
        id: &TransactionId,
        reason: &str,
        evidence: Vec<u8>,
    ) -> BridgeResult<()> {
        self.ensure_operational()?;
        let now = self.clock.now();
        self.atomically("challenge", |engine| {
            engine
                .challenges
                .challenge(id, challenger, reason, evidence, &mut engine.state.transactions, now)
        })
    }

    /// Decide the current challenge of a transaction
    pub fn resolve_challenge(
        &mut self,
        caller: &Pubkey,
        id: &TransactionId,
        uphold: bool,
        note: &str,
    ) -> BridgeResult<TransactionStatus> {
        self.ensure_operational()?;
        let now = self.clock.now();
        self.atomically("resolve_challenge", |engine| {
            let state = &mut engine.state;
            engine.challenges.resolve_challenge(
                id,
                caller,
                uphold,
                note,
                &mut state.transactions,
                &state.tokens,
                &mut state.ledger,
                &mut state.pools,
                &mut state.validators,
                now,
            )
        })
    }

    // Settlement

    /// Settle a VALIDATED transaction whose challenge window has elapsed.
    /// `executing_chain` must be a registered, active destination chain.
    pub fn execute(
        &mut self,
        relayer: &Pubkey,
        id: &TransactionId,
        executing_chain: ChainId,
    ) -> BridgeResult<FeeDistribution> {
        self.ensure_running()?;
        let now = self.clock.now();
        self.atomically("execute", |engine| {
            let state = &mut engine.state;
            if !state.chains.is_chain_active(executing_chain) {
                return Err(BridgeError::InvalidChain(executing_chain));
            }
            engine.settlement.execute(
                id,
                relayer,
                executing_chain,
                &mut state.transactions,
                &state.tokens,
                &mut state.ledger,
                &mut state.pools,
                &mut state.validators,
                now,
            )
        })
    }

    // Liquidity

    /// Move funds from a provider's balance into a pool, returning shares
    pub fn deposit_liquidity(&mut self, provider: &Pubkey, token: &Pubkey, amount: u64) -> BridgeResult<u64> {
        self.ensure_running()?;
        let now = self.clock.now();
        self.atomically("deposit_liquidity", |engine| {
            let state = &mut engine.state;
            state.ledger.debit(provider, token, amount)?;
            state.pools.deposit(provider, token, amount, now)
        })
    }

    /// Redeem pool shares into the provider's balance
    pub fn withdraw_liquidity(&mut self, provider: &Pubkey, token: &Pubkey, shares: u64) -> BridgeResult<u64> {
        self.ensure_operational()?;
        let now = self.clock.now();
        self.atomically("withdraw_liquidity", |engine| {
            let state = &mut engine.state;
            let amount = state.pools.withdraw(provider, token, shares, now)?;
            state.ledger.credit(provider, token, amount)?;
            Ok(amount)
        })
    }

    // Queries

    /// A transaction by id
    pub fn transaction(&self, id: &TransactionId) -> Option<&BridgeTransaction> {
        self.state.transactions.get(id)
    }

    /// Transactions awaiting settlement (PENDING, VALIDATED or CHALLENGED)
    /// in discovery order
    pub fn pending_transactions(&self) -> Vec<&BridgeTransaction> {
        self.state
            .transactions
            .pending_ids()
            .iter()
            .filter_map(|id| self.state.transactions.get(id))
            .collect()
    }

    /// Attestations counted for a transaction
    pub fn attestations(&self, id: &TransactionId) -> &[Attestation] {
        self.state.transactions.attestations(id)
    }

    /// Balance of an account
    pub fn balance(&self, account: &Pubkey, token: &Pubkey) -> u64 {
        self.state.ledger.balance(account, token)
    }

    /// Amount escrowed for a token
    pub fn escrowed(&self, token: &Pubkey) -> u64 {
        self.state.ledger.escrowed(token)
    }

    /// Pool state of a token
    pub fn pool(&self, token: &Pubkey) -> Option<&LiquidityPoolState> {
        self.state.pools.get_pool(token)
    }

    /// A validator's registry entry
    pub fn validator(&self, validator: &Pubkey) -> Option<&ValidatorInfo> {
        self.state.validators.get_validator(validator)
    }

    /// Nonce the validator must bind into its next attestation
    pub fn validator_nonce(&self, validator: &Pubkey) -> BridgeResult<u64> {
        self.state.validators.expected_nonce(validator)
    }

    /// Health of the registered chains and validators
    pub fn health_report(&self) -> HealthReport {
        self.monitor.report(&self.state, self.clock.now())
    }

    /// Full bridge state
    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.state.config
    }

    /// Whether the bridge is paused
    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Whether a fatal error stopped the engine
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn ensure_authority(&self, caller: &Pubkey) -> BridgeResult<()> {
        self.ensure_operational()?;
        if *caller != self.state.config.authority {
            return Err(BridgeError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// Operations that remain available while paused
    fn ensure_operational(&self) -> BridgeResult<()> {
        if self.halted {
            return Err(BridgeError::EngineHalted);
        }
        Ok(())
    }

    /// Operations refused while paused
    fn ensure_running(&self) -> BridgeResult<()> {
        self.ensure_operational()?;
        if self.state.paused {
            return Err(BridgeError::Paused);
        }
        Ok(())
    }

    fn reserve_liquidity(&mut self, id: &TransactionId) -> BridgeResult<()> {
        let transaction = self.state.transactions.require(id)?;
        let config = self
            .state
            .tokens
            .get_token(&transaction.token)
            .ok_or(BridgeError::InvalidToken(transaction.token))?;
        if config.mode == BridgeMode::LiquidityPool {
            let amount = transaction.delivered_amount.unwrap_or(transaction.amount);
            self.state.pools.reserve(&config.destination_asset(), amount);
        }
        Ok(())
    }

    /// Run `operation` as one unit. On success the state is persisted; on
    /// any error it is rolled back to where it was before the operation.
    fn atomically<T, F>(&mut self, name: &str, operation: F) -> BridgeResult<T>
    where
        F: FnOnce(&mut Self) -> BridgeResult<T>,
    {
        let checkpoint = self.state.clone();
        let result = operation(self).and_then(|value| self.persist().map(|_| value));

        if let Err(err) = &result {
            self.state = checkpoint;
            // A pool halt outlives the rollback
            if let BridgeError::PoolHalted(token) = err {
                if self.state.pools.halt(token) {
                    self.persist().ok();
                }
            }
        }
        self.commit(name, result)
    }

    /// Log the outcome of an operation, halting the engine on fatal errors
    fn commit<T>(&mut self, operation: &str, result: BridgeResult<T>) -> BridgeResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if halts_engine(&err) => {
                self.halted = true;
                error!("{} failed with a fatal error, engine halted: {}", operation, err);
                Err(err)
            }
            Err(err) => {
                warn!("{} rejected: {}", operation, err);
                Err(err)
            }
        }
    }

    fn persist(&mut self) -> BridgeResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if let Err(err) = store.save(&self.state) {
            self.halted = true;
            error!("Persisting bridge state to {} failed, engine halted: {}", store.path().display(), err);
            return Err(BridgeError::EngineHalted);
        }
        Ok(())
    }
}

/// Fatal errors: the state is rolled back but can no longer be trusted
fn halts_engine(err: &BridgeError) -> bool {
    matches!(
        err,
        BridgeError::InvariantViolation(_)
            | BridgeError::Arithmetic(_)
            | BridgeError::Storage(_)
            | BridgeError::Serialization(_)
            | BridgeError::Internal(_)
    )
}

/// Destination-side amount of a transaction, converted when the token
/// delivers a different asset
fn delivered_amount(
    tokens: &TokenRegistry,
    oracle: Option<&dyn ConversionOracle>,
    transaction: &BridgeTransaction,
) -> BridgeResult<u64> {
    let config = tokens
        .get_token(&transaction.token)
        .ok_or(BridgeError::InvalidToken(transaction.token))?;
    let to = config.destination_asset();
    if to == transaction.token {
        return Ok(transaction.amount);
    }

    let unavailable = BridgeError::OracleUnavailable {
        from: transaction.token,
        to,
    };
    let rate = oracle
        .and_then(|o| o.conversion_rate(&transaction.token, &to))
        .ok_or(unavailable)?;
    oracle::convert(transaction.amount, rate)
}

/// Thread-safe handle serializing every operation on one engine
#[derive(Clone)]
pub struct SharedBridge {
    inner: Arc<RwLock<BridgeEngine>>,
}

impl SharedBridge {
    /// Share an engine
    pub fn new(engine: BridgeEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Run a mutating operation under the write lock
    pub fn write<T, F>(&self, operation: F) -> BridgeResult<T>
    where
        F: FnOnce(&mut BridgeEngine) -> BridgeResult<T>,
    {
        let mut engine = self.inner.write().map_err(|_| poisoned())?;
        operation(&mut engine)
    }

    /// Run a query under the read lock
    pub fn read<T, F>(&self, query: F) -> BridgeResult<T>
    where
        F: FnOnce(&BridgeEngine) -> T,
    {
        let engine = self.inner.read().map_err(|_| poisoned())?;
        Ok(query(&engine))
    }
}

fn poisoned() -> BridgeError {
    error!("Bridge lock poisoned; state may be inconsistent");
    BridgeError::Internal("bridge lock poisoned".into())
}
