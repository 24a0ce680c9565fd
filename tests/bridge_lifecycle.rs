// tests/bridge_lifecycle.rs
mod common;

use common::{setup, setup_durable, TestBridge, CHALLENGE_PERIOD, DESTINATION_CHAIN, UNIT};
use layer2_bridge::{
    AttestationOutcome, BridgeError, BridgeMode, SnapshotStore, TransactionStatus, TransferRequest,
};
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signer;

fn relayer() -> Pubkey {
    Pubkey::new_unique()
}

#[test]
fn test_initiate_escrows_and_reports_pending() {
    let mut bridge = setup(BridgeMode::LockMint);

    // Quote first, the way a wallet would
    let quote = bridge
        .engine
        .quote_fee(&bridge.token, DESTINATION_CHAIN, 100 * UNIT)
        .unwrap();
    assert_eq!(quote.total().unwrap(), UNIT, "Fee should be 1% of the amount");

    let id = bridge.initiate();

    let tx = bridge.engine.transaction(&id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending, "New transfer should be pending");
    assert_eq!(
        bridge.engine.balance(&bridge.sender, &bridge.token),
        899 * UNIT,
        "Sender should be debited amount plus fee"
    );
    assert_eq!(bridge.engine.escrowed(&bridge.token), 101 * UNIT);
    assert_eq!(bridge.engine.pending_transactions().len(), 1);
}

#[test]
fn test_pool_mode_end_to_end() {
    let mut bridge = setup(BridgeMode::LiquidityPool);
    bridge.provide_liquidity(500 * UNIT);

    let id = bridge.initiate();

    // 3 of 4 validators attest valid
    assert_eq!(bridge.attest(0, &id, true).unwrap(), AttestationOutcome::Recorded);
    assert_eq!(bridge.attest(1, &id, true).unwrap(), AttestationOutcome::Recorded);
    assert_eq!(bridge.attest(2, &id, true).unwrap(), AttestationOutcome::Validated);
    assert_eq!(bridge.engine.transaction(&id).unwrap().status, TransactionStatus::Validated);

    // No challenge; execute once the window has elapsed
    bridge.clock.advance(CHALLENGE_PERIOD);
    let relayer = relayer();
    let distribution = bridge.engine.execute(&relayer, &id, DESTINATION_CHAIN).unwrap();

    let tx = bridge.engine.transaction(&id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Executed, "Transaction should be executed");
    assert_eq!(
        bridge.engine.balance(&bridge.recipient, &bridge.token),
        100 * UNIT,
        "Recipient should receive the full amount"
    );
    assert_eq!(
        bridge.engine.pool(&bridge.token).unwrap().balance,
        400 * UNIT,
        "Pool should be debited by the amount"
    );
    assert!(bridge.engine.pending_transactions().is_empty());

    // 70% of the fee split between the three valid attesters, the rest to the relayer
    assert_eq!(distribution.per_validator, 233_333);
    for key in &bridge.validators[..3] {
        assert_eq!(bridge.engine.balance(&key.pubkey(), &bridge.token), 233_333);
        assert_eq!(bridge.engine.validator(&key.pubkey()).unwrap().rewards_earned, 233_333);
    }
    assert_eq!(bridge.engine.balance(&bridge.validators[3].pubkey(), &bridge.token), 0);
    assert_eq!(bridge.engine.balance(&relayer, &bridge.token), 300_001);
}

#[test]
fn test_upheld_challenge_refunds_sender() {
    let mut bridge = setup(BridgeMode::LiquidityPool);
    bridge.provide_liquidity(500 * UNIT);

    let id = bridge.initiate();
    bridge.validate(&id);

    // Dispute within the window
    bridge.clock.advance(CHALLENGE_PERIOD / 2);
    let challenger = Pubkey::new_unique();
    bridge
        .engine
        .challenge(&challenger, &id, "source transaction reverted", vec![0xde, 0xad])
        .unwrap();
    assert_eq!(bridge.engine.transaction(&id).unwrap().status, TransactionStatus::Challenged);

    // Settlement is blocked while challenged
    bridge.clock.advance(CHALLENGE_PERIOD);
    assert!(matches!(
        bridge.engine.execute(&relayer(), &id, DESTINATION_CHAIN),
        Err(BridgeError::InvalidStatus { .. })
    ));

    let resolver = bridge.resolver;
    let status = bridge.engine.resolve_challenge(&resolver, &id, true, "proof confirmed").unwrap();
    assert_eq!(status, TransactionStatus::Failed);

    assert_eq!(
        bridge.engine.balance(&bridge.sender, &bridge.token),
        1_000 * UNIT,
        "Sender should get amount and fee back"
    );
    assert_eq!(bridge.engine.balance(&bridge.recipient, &bridge.token), 0);
    let pool = bridge.engine.pool(&bridge.token).unwrap();
    assert_eq!(pool.balance, 500 * UNIT, "Pool should be untouched");
    assert_eq!(pool.reserved, 0);
}

#[test]
fn test_denied_challenge_settles_after_original_window() {
    let mut bridge = setup(BridgeMode::LockMint);
    let id = bridge.initiate();
    bridge.validate(&id);

    bridge.clock.advance(CHALLENGE_PERIOD - 10);
    bridge.engine.challenge(&Pubkey::new_unique(), &id, "suspicious", vec![]).unwrap();
    let resolver = bridge.resolver;
    assert_eq!(
        bridge.engine.resolve_challenge(&resolver, &id, false, "evidence rejected").unwrap(),
        TransactionStatus::Validated
    );

    // The window was not extended by the challenge
    bridge.clock.advance(10);
    bridge.engine.execute(&relayer(), &id, DESTINATION_CHAIN).unwrap();
    assert_eq!(bridge.engine.balance(&bridge.recipient, &bridge.token), 100 * UNIT);
}

#[test]
fn test_execute_twice_settles_once() {
    let mut bridge = setup(BridgeMode::BurnMint);
    let id = bridge.initiate();
    bridge.validate(&id);
    bridge.clock.advance(CHALLENGE_PERIOD);

    let relayer = relayer();
    bridge.engine.execute(&relayer, &id, DESTINATION_CHAIN).unwrap();
    let recipient_balance = bridge.engine.balance(&bridge.recipient, &bridge.token);
    let relayer_balance = bridge.engine.balance(&relayer, &bridge.token);

    assert_eq!(
        bridge.engine.execute(&relayer, &id, DESTINATION_CHAIN),
        Err(BridgeError::AlreadyProcessed(id))
    );
    assert_eq!(bridge.engine.balance(&bridge.recipient, &bridge.token), recipient_balance);
    assert_eq!(bridge.engine.balance(&relayer, &bridge.token), relayer_balance);
}

#[test]
fn test_window_boundary() {
    let mut bridge = setup(BridgeMode::LockMint);
    let id = bridge.initiate();
    bridge.validate(&id);

    bridge.clock.advance(CHALLENGE_PERIOD - 1);
    assert!(matches!(
        bridge.engine.execute(&relayer(), &id, DESTINATION_CHAIN),
        Err(BridgeError::ChallengePeriodActive { .. })
    ));
    assert_eq!(bridge.engine.transaction(&id).unwrap().status, TransactionStatus::Validated);

    bridge.clock.advance(1);
    assert!(matches!(
        bridge.engine.challenge(&Pubkey::new_unique(), &id, "late", vec![]),
        Err(BridgeError::ChallengePeriodExpired { .. })
    ));
    bridge.engine.execute(&relayer(), &id, DESTINATION_CHAIN).unwrap();
}

#[test]
fn test_insufficient_liquidity_is_retryable() {
    let mut bridge = setup(BridgeMode::LiquidityPool);
    let provider = bridge.provide_liquidity(50 * UNIT);

    let id = bridge.initiate();
    bridge.validate(&id);
    bridge.clock.advance(CHALLENGE_PERIOD);

    let result = bridge.engine.execute(&relayer(), &id, DESTINATION_CHAIN);
    assert!(
        matches!(result, Err(BridgeError::InsufficientLiquidity { .. })),
        "Settlement should fail on a short pool"
    );
    assert_eq!(bridge.engine.pool(&bridge.token).unwrap().balance, 50 * UNIT);
    assert_eq!(bridge.engine.transaction(&id).unwrap().status, TransactionStatus::Validated);

    // The reservation keeps the provider from draining the pool meanwhile
    let token = bridge.token;
    assert!(bridge.engine.withdraw_liquidity(&provider, &token, 1).is_err());

    bridge.provide_liquidity(50 * UNIT);
    bridge.engine.execute(&relayer(), &id, DESTINATION_CHAIN).unwrap();
    assert_eq!(bridge.engine.pool(&token).unwrap().balance, 0);
}

#[test]
fn test_rejected_transfer_is_refunded() {
    let mut bridge = setup(BridgeMode::LockMint);
    let id = bridge.initiate();

    bridge.attest(0, &id, false).unwrap();
    assert_eq!(bridge.attest(1, &id, false).unwrap(), AttestationOutcome::Rejected);

    assert_eq!(bridge.engine.transaction(&id).unwrap().status, TransactionStatus::Rejected);
    assert_eq!(bridge.engine.balance(&bridge.sender, &bridge.token), 1_000 * UNIT);
    assert!(matches!(
        bridge.attest(2, &id, true),
        Err(BridgeError::InvalidStatus { .. })
    ));
}

#[test]
fn test_cancel_refused_once_validated() {
    let mut bridge = setup(BridgeMode::LockMint);
    let id = bridge.initiate();
    bridge.validate(&id);

    let sender = bridge.sender;
    assert!(
        matches!(bridge.engine.cancel_transfer(&sender, &id), Err(BridgeError::InvalidStatus { .. })),
        "Validated transfer should not be cancellable"
    );
    assert_eq!(bridge.engine.transaction(&id).unwrap().status, TransactionStatus::Validated);
    assert_eq!(bridge.engine.balance(&sender, &bridge.token), 899 * UNIT);
    assert_eq!(bridge.engine.escrowed(&bridge.token), 101 * UNIT);
    assert!(!bridge.engine.is_halted());

    bridge.clock.advance(CHALLENGE_PERIOD);
    bridge.engine.execute(&relayer(), &id, DESTINATION_CHAIN).unwrap();
}

#[test]
fn test_validation_errors_change_nothing() {
    let mut bridge = setup(BridgeMode::LockMint);

    let cases = vec![
        (
            TransferRequest { fee_paid: UNIT - 1, ..bridge.request() },
            BridgeError::InsufficientFee { required: UNIT, paid: UNIT - 1 },
        ),
        (
            TransferRequest { destination_chain: 42, ..bridge.request() },
            BridgeError::InvalidChain(42),
        ),
        (
            TransferRequest { recipient: Pubkey::default(), ..bridge.request() },
            BridgeError::InvalidRecipient,
        ),
        (
            TransferRequest { amount: 0, fee_paid: 0, ..bridge.request() },
            BridgeError::AmountOutOfBounds { amount: 0, min: 1, max: 1_000_000_000_000_000 },
        ),
    ];

    for (request, expected) in cases {
        assert_eq!(bridge.engine.initiate_transfer(&request), Err(expected));
    }

    assert_eq!(bridge.engine.balance(&bridge.sender, &bridge.token), 1_000 * UNIT);
    assert!(bridge.engine.pending_transactions().is_empty());
}

#[test]
fn test_daily_limit() {
    let mut bridge = setup(BridgeMode::LockMint);
    let authority = bridge.authority;
    let token = Pubkey::new_unique();
    bridge
        .engine
        .add_token(
            &authority,
            layer2_bridge::TokenConfig {
                token,
                symbol: "LIM".to_string(),
                decimals: 6,
                mode: BridgeMode::LockMint,
                fee_bps: 0,
                is_active: true,
                destination_token: None,
                daily_limit: Some(150 * UNIT),
                registered_at: 0,
            },
        )
        .unwrap();
    let sender = bridge.sender;
    bridge.engine.fund_account(&authority, &sender, &token, 1_000 * UNIT).unwrap();

    let request = TransferRequest { token, ..bridge.request() };
    bridge.engine.initiate_transfer(&request).unwrap();
    assert!(matches!(
        bridge.engine.initiate_transfer(&request),
        Err(BridgeError::DailyLimitExceeded { .. })
    ));

    // A new day resets the volume
    bridge.clock.advance(86_400);
    bridge.engine.initiate_transfer(&request).unwrap();
}

#[test]
fn test_validator_management() {
    let mut bridge = setup(BridgeMode::LockMint);
    let authority = bridge.authority;
    let first = bridge.validators[0].pubkey();
    let second = bridge.validators[1].pubkey();

    bridge.engine.remove_validator(&authority, &first).unwrap();
    assert_eq!(
        bridge.engine.remove_validator(&authority, &second),
        Err(BridgeError::BelowMinimumValidators { min: 3 })
    );

    let slashed = bridge.engine.slash_validator(&authority, &second, 1_000, "equivocation").unwrap();
    assert_eq!(slashed, 1_000);
    assert_eq!(bridge.engine.validator(&second).unwrap().stake, 9_000);

    // A removed validator cannot attest
    let id = bridge.initiate();
    assert_eq!(bridge.attest(0, &id, true), Err(BridgeError::ValidatorNotActive(first)));
}

#[test]
fn test_state_survives_restart() {
    let path = std::env::temp_dir().join(format!("bridge-{}.snapshot", Pubkey::new_unique()));

    let (id, sender, token, validator) = {
        let mut bridge: TestBridge = setup_durable(BridgeMode::LockMint, SnapshotStore::new(&path));
        let id = bridge.initiate();
        bridge.attest(0, &id, true).unwrap();
        (id, bridge.sender, bridge.token, bridge.validators[0].pubkey())
    };

    let reopened = layer2_bridge::BridgeEngine::open(
        layer2_bridge::BridgeConfig::default(),
        Box::new(layer2_bridge::ManualClock::new(1_700_000_000)),
        Box::new(layer2_bridge::Ed25519AttestationVerifier),
        SnapshotStore::new(&path),
    )
    .unwrap();

    let tx = reopened.transaction(&id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.valid_votes, 1);
    assert_eq!(reopened.attestations(&id).len(), 1);
    assert_eq!(reopened.balance(&sender, &token), 899 * UNIT);
    assert_eq!(reopened.validator_nonce(&validator).unwrap(), 1, "Nonce must survive a restart");
    assert_eq!(reopened.pending_transactions().len(), 1);
    assert_eq!(reopened.config().challenge_period, CHALLENGE_PERIOD);

    std::fs::remove_file(&path).unwrap();
}
