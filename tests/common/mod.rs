// tests/common/mod.rs
#![allow(dead_code)]

use layer2_bridge::bridge::sign_attestation;
use layer2_bridge::{
    AttestationOutcome, BridgeConfig, BridgeEngine, BridgeMode, BridgeResult, ChainConfig,
    Ed25519AttestationVerifier, ManualClock, SnapshotStore, TokenConfig, TransactionId,
    TransferRequest,
};
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};

/// One whole token (6 decimals)
pub const UNIT: u64 = 1_000_000;

/// Destination chain registered by the harness
pub const DESTINATION_CHAIN: u64 = 2;

/// Challenge period used by the harness (in seconds)
pub const CHALLENGE_PERIOD: u64 = 3_600;

pub struct TestBridge {
    pub engine: BridgeEngine,
    pub clock: ManualClock,
    pub authority: Pubkey,
    pub resolver: Pubkey,
    pub validators: Vec<Keypair>,
    pub token: Pubkey,
    pub sender: Pubkey,
    pub recipient: Pubkey,
}

pub fn config(authority: Pubkey, resolver: Pubkey) -> BridgeConfig {
    BridgeConfig {
        authority,
        resolver,
        local_chain_id: 1,
        base_fee_bps: 0,
        quorum: 3,
        approval_threshold_bps: 6_700,
        challenge_period: CHALLENGE_PERIOD,
        min_active_validators: 3,
        validator_reward_bps: 7_000,
        ..BridgeConfig::default()
    }
}

/// A bridge with chain 2 (1% fee), one token in `mode`, four validators and
/// a sender holding 1000 tokens
pub fn setup(mode: BridgeMode) -> TestBridge {
    let authority = Pubkey::new_unique();
    let resolver = Pubkey::new_unique();
    let clock = ManualClock::new(1_700_000_000);
    let engine = BridgeEngine::new(
        config(authority, resolver),
        Box::new(clock.clone()),
        Box::new(Ed25519AttestationVerifier),
    )
    .unwrap();
    register(engine, clock, authority, resolver, mode)
}

/// Same as `setup`, backed by a snapshot store
pub fn setup_durable(mode: BridgeMode, store: SnapshotStore) -> TestBridge {
    let authority = Pubkey::new_unique();
    let resolver = Pubkey::new_unique();
    let clock = ManualClock::new(1_700_000_000);
    let engine = BridgeEngine::open(
        config(authority, resolver),
        Box::new(clock.clone()),
        Box::new(Ed25519AttestationVerifier),
        store,
    )
    .unwrap();
    register(engine, clock, authority, resolver, mode)
}

fn register(
    mut engine: BridgeEngine,
    clock: ManualClock,
    authority: Pubkey,
    resolver: Pubkey,
    mode: BridgeMode,
) -> TestBridge {
    engine
        .add_chain(
            &authority,
            ChainConfig {
                chain_id: DESTINATION_CHAIN,
                name: "ethereum".to_string(),
                fee_bps: 100,
                is_active: true,
                required_confirmations: 12,
                registered_at: 0,
            },
        )
        .unwrap();

    let token = Pubkey::new_unique();
    engine
        .add_token(
            &authority,
            TokenConfig {
                token,
                symbol: "X".to_string(),
                decimals: 6,
                mode,
                fee_bps: 0,
                is_active: true,
                destination_token: None,
                daily_limit: None,
                registered_at: 0,
            },
        )
        .unwrap();

    let validators: Vec<Keypair> = (0..4).map(|_| Keypair::new()).collect();
    for validator in &validators {
        engine.add_validator(&authority, validator.pubkey(), 10_000).unwrap();
    }

    let sender = Pubkey::new_unique();
    engine.fund_account(&authority, &sender, &token, 1_000 * UNIT).unwrap();

    TestBridge {
        engine,
        clock,
        authority,
        resolver,
        validators,
        token,
        sender,
        recipient: Pubkey::new_unique(),
    }
}

impl TestBridge {
    /// Request for 100 tokens with the exact 1-token fee
    pub fn request(&self) -> TransferRequest {
        TransferRequest {
            sender: self.sender,
            token: self.token,
            amount: 100 * UNIT,
            destination_chain: DESTINATION_CHAIN,
            recipient: self.recipient,
            fee_paid: UNIT,
        }
    }

    pub fn initiate(&mut self) -> TransactionId {
        let request = self.request();
        self.engine.initiate_transfer(&request).unwrap()
    }

    pub fn attest(&mut self, index: usize, id: &TransactionId, is_valid: bool) -> BridgeResult<AttestationOutcome> {
        let key = &self.validators[index];
        let nonce = self.engine.validator_nonce(&key.pubkey())?;
        let proof = sign_attestation(key, id, is_valid, nonce)?;
        self.engine.submit_attestation(&key.pubkey(), id, is_valid, proof)
    }

    /// Three of four validators attest valid
    pub fn validate(&mut self, id: &TransactionId) {
        for index in 0..3 {
            self.attest(index, id, true).unwrap();
        }
    }

    /// Fund a liquidity provider and deposit into the token pool
    pub fn provide_liquidity(&mut self, amount: u64) -> Pubkey {
        let provider = Pubkey::new_unique();
        let (authority, token) = (self.authority, self.token);
        self.engine.fund_account(&authority, &provider, &token, amount).unwrap();
        self.engine.deposit_liquidity(&provider, &token, amount).unwrap();
        provider
    }
}
