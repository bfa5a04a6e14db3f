//! Security Hardening Tests
//!
//! Adversarial testing of the clearing house:
//! - Permission escalation
//! - Repeated withdrawal (replay)
//! - Incorrect and foreign signatures
//! - Cross-ledger replay
//! - Failing and dishonest token capabilities
//! - Arithmetic overflow
//! - De-listing does not strand custody
//! - Fuzz testing (proptest)

use clearing_house::errors::{ClearingError, TokenError};
use clearing_house::events::ContractEvent;
use clearing_house::signing::{AuthorizationSigner, Secp256k1Signer};
use clearing_house::token::{FungibleToken, InMemoryTokens};
use clearing_house::{ClearingHouse, ClearingHouseConfig, WithdrawalAuthorization, CONTRACT_ABI_VERSION};
use rust_decimal::Decimal;
use types::ids::{Address, TokenId};
use types::numeric::Amount;

const RECEIVER: &str = "external-account-7f3a";

// ═══════════════════════════════════════════════════════════════════
// Permission Tests
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_non_custodian_cannot_add_token() {
    let (mut ch, _, _) = setup();
    let other = TokenId::new(Address::new([0x99; 20]));
    let result = ch.add_token(&user(), other);
    assert!(matches!(result, Err(ClearingError::Unauthorized { .. })));
    assert!(!ch.is_supported(&other));
}

#[test]
fn test_non_custodian_cannot_remove_token() {
    let (mut ch, _, _) = setup();
    let result = ch.remove_token(&user(), token());
    assert!(matches!(result, Err(ClearingError::Unauthorized { .. })));
    assert!(ch.is_supported(&token()));
}

#[test]
fn test_non_custodian_cannot_transfer_custodian() {
    let (mut ch, _, key) = setup();
    let result = ch.transfer_custodian(&user(), user());
    assert!(matches!(result, Err(ClearingError::Unauthorized { .. })));
    assert_eq!(ch.custodian(), key.address());
}

#[test]
fn test_custodian_cannot_transfer_to_null() {
    let (mut ch, _, key) = setup();
    let result = ch.transfer_custodian(&key.address(), Address::ZERO);
    assert!(matches!(result, Err(ClearingError::InvalidArgument { .. })));
    assert_eq!(ch.custodian(), key.address());
}

#[test]
fn test_registry_lifecycle() {
    let key = custodian_key();
    let mut ch = ClearingHouse::new(ClearingHouseConfig::for_ledger(ledger_address()), key.address()).unwrap();
    assert!(!ch.is_supported(&token()));
    ch.add_token(&key.address(), token()).unwrap();
    assert!(ch.is_supported(&token()));
    ch.remove_token(&key.address(), token()).unwrap();
    assert!(!ch.is_supported(&token()));
}

#[test]
fn test_anyone_may_deposit() {
    let (mut ch, mut tokens, _) = setup();
    let stranger = Address::new([0x5e; 20]);
    tokens.mint(&token(), &stranger, Decimal::from(3)).unwrap();
    tokens.approve(&token(), &stranger, &ledger_address(), Decimal::from(3));
    ch.deposit(&mut tokens, &stranger, token(), RECEIVER, Decimal::from(3))
        .unwrap();
    assert_eq!(ch.custody_balance(&token()), Decimal::from(3));
}

// ═══════════════════════════════════════════════════════════════════
// End-to-end Scenario
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_deposit_withdraw_replay_and_forgery() {
    init_tracing();
    let (mut ch, mut tokens, key) = setup();

    ch.deposit(&mut tokens, &user(), token(), RECEIVER, Decimal::from(50))
        .unwrap();
    let before = tokens.balance_of(&token(), &user());

    ch.withdraw(&mut tokens, &user(), &authorize(&key, 40, 1)).unwrap();
    assert_eq!(tokens.balance_of(&token(), &user()), before + Decimal::from(40));
    assert_eq!(ch.custody_balance(&token()), Decimal::from(10));

    let replay = ch.withdraw(&mut tokens, &user(), &authorize(&key, 40, 1));
    assert_eq!(
        replay,
        Err(ClearingError::InvalidNonce {
            requester: user(),
            provided: 1,
            last_used: 1,
        })
    );

    let forger = Secp256k1Signer::from_bytes(&[0x66; 32]).unwrap();
    let forged = ch.withdraw(&mut tokens, &user(), &authorize(&forger, 5, 2));
    assert!(matches!(forged, Err(ClearingError::Unauthorized { .. })));

    assert_eq!(ch.custody_balance(&token()), Decimal::from(10));
    assert_eq!(ch.last_nonce(&user()), 1);
    assert!(ch.reconcile(&tokens, &token()).is_balanced());
}

// ═══════════════════════════════════════════════════════════════════
// Simulate Repeated Withdraw (Replay Attack)
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_lower_nonce_after_higher_rejected() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(100));

    ch.withdraw(&mut tokens, &user(), &authorize(&key, 1, 5)).unwrap();
    let stale = ch.withdraw(&mut tokens, &user(), &authorize(&key, 1, 3));
    assert!(matches!(stale, Err(ClearingError::InvalidNonce { .. })));
    assert_eq!(ch.last_nonce(&user()), 5);
}

#[test]
fn test_nonces_are_per_requester() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(100));
    let second = Address::new([0x13; 20]);

    ch.withdraw(&mut tokens, &user(), &authorize(&key, 1, 1)).unwrap();
    let auth = key
        .authorize(&ledger_address(), token(), Decimal::from(1), 1, second)
        .unwrap();
    ch.withdraw(&mut tokens, &user(), &auth).unwrap();

    assert_eq!(ch.last_nonce(&user()), 1);
    assert_eq!(ch.last_nonce(&second), 1);
    assert_eq!(tokens.balance_of(&token(), &second), Decimal::from(1));
}

#[test]
fn test_replay_at_another_ledger_rejected() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));

    let sibling_address = Address::new([0xc9; 20]);
    let mut sibling =
        ClearingHouse::new(ClearingHouseConfig::for_ledger(sibling_address), key.address()).unwrap();
    sibling.add_token(&key.address(), token()).unwrap();
    tokens.mint(&token(), &user(), Decimal::from(50)).unwrap();
    tokens.approve(&token(), &user(), &sibling_address, Decimal::from(50));
    sibling
        .deposit(&mut tokens, &user(), token(), RECEIVER, Decimal::from(50))
        .unwrap();

    let auth = authorize(&key, 20, 1);
    ch.withdraw(&mut tokens, &user(), &auth).unwrap();
    let replay = sibling.withdraw(&mut tokens, &user(), &auth);
    assert!(matches!(replay, Err(ClearingError::Unauthorized { .. })));
    assert_eq!(sibling.custody_balance(&token()), Decimal::from(50));
}

// ═══════════════════════════════════════════════════════════════════
// Simulate Incorrect Signature
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_signature_for_other_requester_rejected() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));

    let thief = Address::new([0xee; 20]);
    let mut auth = authorize(&key, 10, 1);
    auth.requester = thief;
    let result = ch.withdraw(&mut tokens, &thief, &auth);
    assert!(matches!(result, Err(ClearingError::Unauthorized { .. })));
    assert_eq!(ch.last_nonce(&thief), 0);
    assert_eq!(tokens.balance_of(&token(), &thief), Decimal::ZERO);
}

#[test]
fn test_truncated_signature_rejected() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));

    let mut auth = authorize(&key, 10, 1);
    auth.signature.truncate(64);
    let result = ch.withdraw(&mut tokens, &user(), &auth);
    assert!(matches!(result, Err(ClearingError::Unauthorized { .. })));
}

#[test]
fn test_flipped_signature_byte_rejected() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));

    let mut auth = authorize(&key, 10, 1);
    auth.signature[10] ^= 0x01;
    let result = ch.withdraw(&mut tokens, &user(), &auth);
    assert!(matches!(result, Err(ClearingError::Unauthorized { .. })));
    assert_eq!(ch.custody_balance(&token()), Decimal::from(50));
}

#[test]
fn test_empty_signature_rejected() {
    let (mut ch, mut tokens, _) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));

    let auth = WithdrawalAuthorization {
        token: token(),
        amount: Decimal::from(10),
        nonce: 1,
        requester: user(),
        signature: Vec::new(),
    };
    let result = ch.withdraw(&mut tokens, &user(), &auth);
    assert!(matches!(result, Err(ClearingError::Unauthorized { .. })));
}

// ═══════════════════════════════════════════════════════════════════
// Simulate Malicious Token
// ═══════════════════════════════════════════════════════════════════

/// Reports success for every pull but never moves anything.
struct LyingToken {
    inner: InMemoryTokens,
}

impl FungibleToken for LyingToken {
    fn transfer_from(
        &mut self,
        _token: &TokenId,
        _spender: &Address,
        _owner: &Address,
        _recipient: &Address,
        _amount: Amount,
    ) -> Result<(), TokenError> {
        Ok(())
    }

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.inner.transfer(token, from, to, amount)
    }

    fn balance_of(&self, token: &TokenId, holder: &Address) -> Amount {
        self.inner.balance_of(token, holder)
    }
}

#[test]
fn test_reconcile_exposes_dishonest_token() {
    let (mut ch, _, _) = setup();
    let mut lying = LyingToken {
        inner: InMemoryTokens::new(),
    };
    ch.deposit(&mut lying, &user(), token(), RECEIVER, Decimal::from(25))
        .unwrap();

    let reconciliation = ch.reconcile(&lying, &token());
    assert!(!reconciliation.is_balanced());
    assert_eq!(reconciliation.recorded, Decimal::from(25));
    assert_eq!(reconciliation.actual, Decimal::ZERO);
}

#[test]
fn test_paused_token_blocks_deposit_without_state_change() {
    let (mut ch, mut tokens, _) = setup();
    tokens.pause(&token());
    let events_before = ch.events().len();

    let result = ch.deposit(&mut tokens, &user(), token(), RECEIVER, Decimal::from(10));
    assert!(matches!(result, Err(ClearingError::TransferFailed { .. })));
    assert_eq!(ch.custody_balance(&token()), Decimal::ZERO);
    assert_eq!(ch.events().len(), events_before);
}

#[test]
fn test_paused_withdraw_keeps_nonce_usable() {
    init_tracing();
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));
    tokens.pause(&token());

    let auth = authorize(&key, 10, 1);
    assert!(matches!(
        ch.withdraw(&mut tokens, &user(), &auth),
        Err(ClearingError::TransferFailed { .. })
    ));
    assert_eq!(ch.last_nonce(&user()), 0);

    tokens.unpause(&token());
    ch.withdraw(&mut tokens, &user(), &auth).unwrap();
    assert_eq!(ch.custody_balance(&token()), Decimal::from(40));
}

// ═══════════════════════════════════════════════════════════════════
// Overflow Tests
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_custody_overflow_rejected_before_pull() {
    let (mut ch, _, _) = setup();
    let mut lying = LyingToken {
        inner: InMemoryTokens::new(),
    };
    ch.deposit(&mut lying, &user(), token(), RECEIVER, Decimal::MAX)
        .unwrap();

    let result = ch.deposit(&mut lying, &user(), token(), RECEIVER, Decimal::from(1));
    assert!(matches!(result, Err(ClearingError::InvalidArgument { .. })));
    assert_eq!(ch.custody_balance(&token()), Decimal::MAX);
}

#[test]
fn test_negative_withdrawal_rejected() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));

    let result = ch.withdraw(&mut tokens, &user(), &authorize(&key, -10, 1));
    assert!(matches!(result, Err(ClearingError::InvalidArgument { .. })));
    assert_eq!(ch.last_nonce(&user()), 0);
}

// ═══════════════════════════════════════════════════════════════════
// De-listing
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_delisted_token_still_withdrawable() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));
    ch.remove_token(&key.address(), token()).unwrap();

    let blocked = ch.deposit(&mut tokens, &user(), token(), RECEIVER, Decimal::from(1));
    assert_eq!(blocked, Err(ClearingError::UnsupportedToken { token: token() }));

    ch.withdraw(&mut tokens, &user(), &authorize(&key, 50, 1)).unwrap();
    assert_eq!(ch.custody_balance(&token()), Decimal::ZERO);
}

#[test]
fn test_event_stream_matches_operations() {
    let (mut ch, mut tokens, key) = setup();
    fund(&mut ch, &mut tokens, Decimal::from(50));
    ch.withdraw(&mut tokens, &user(), &authorize(&key, 5, 1)).unwrap();
    ch.remove_token(&key.address(), token()).unwrap();

    let names: Vec<_> = ch.drain_events().iter().map(|r| r.event.name()).collect();
    assert_eq!(
        names,
        vec!["TokenAdded", "TokensWrapped", "TokensUnwrapped", "TokenRemoved"]
    );
    let json = serde_json::to_string(&ContractEvent::TokenAdded(
        clearing_house::events::TokenAdded { token: token() },
    ))
    .unwrap();
    assert!(json.contains("\"type\":\"TokenAdded\""));
}

// ═══════════════════════════════════════════════════════════════════
// Test Upgrade Path (ABI Freeze)
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_contract_abi_version_frozen() {
    assert_eq!(CONTRACT_ABI_VERSION, "1.0.0");
}

// ═══════════════════════════════════════════════════════════════════
// Fuzz Tests (Proptest)
// ═══════════════════════════════════════════════════════════════════

mod fuzz {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for deposit amounts with up to 6 decimal places
    fn deposit_amount() -> impl Strategy<Value = Decimal> {
        (1i64..=1_000_000_000i64).prop_map(|units| Decimal::new(units, 6))
    }

    proptest! {
        /// Invariant: custody equals the sum of successful deposits.
        #[test]
        fn fuzz_deposit_custody_conservation(
            amounts in prop::collection::vec(deposit_amount(), 1..20),
        ) {
            let (mut ch, mut tokens, _) = setup();
            tokens.mint(&token(), &user(), Decimal::from(1_000_000)).unwrap();
            tokens.approve(&token(), &user(), &ledger_address(), Decimal::from(1_000_100));
            let mut expected_total = Decimal::ZERO;

            for amount in &amounts {
                ch.deposit(&mut tokens, &user(), token(), RECEIVER, *amount).unwrap();
                expected_total += *amount;
            }

            prop_assert_eq!(ch.custody_balance(&token()), expected_total);
            prop_assert!(ch.reconcile(&tokens, &token()).is_balanced());
        }

        /// Invariant: a withdrawal is accepted iff its nonce exceeds the
        /// last one used, and custody always reconciles.
        #[test]
        fn fuzz_nonce_monotonicity(
            nonces in prop::collection::vec(0u64..50u64, 1..15),
        ) {
            let (mut ch, mut tokens, key) = setup();
            fund(&mut ch, &mut tokens, Decimal::from(100));
            let mut last = 0u64;

            for nonce in nonces {
                let result = ch.withdraw(&mut tokens, &user(), &authorize(&key, 1, nonce));
                if nonce > last {
                    prop_assert!(result.is_ok(), "fresh nonce {} rejected", nonce);
                    last = nonce;
                } else {
                    let rejected = matches!(result, Err(ClearingError::InvalidNonce { .. }));
                    prop_assert!(rejected, "stale nonce {} accepted", nonce);
                }
                prop_assert_eq!(ch.last_nonce(&user()), last);
            }
            prop_assert!(ch.reconcile(&tokens, &token()).is_balanced());
        }

        /// Invariant: a withdrawal larger than custody never changes state.
        #[test]
        fn fuzz_cannot_withdraw_more_than_custody(
            deposit in 1i64..=100i64,
            extra in 1i64..1_000i64,
        ) {
            let (mut ch, mut tokens, key) = setup();
            fund(&mut ch, &mut tokens, Decimal::from(deposit));

            let result = ch.withdraw(&mut tokens, &user(), &authorize(&key, deposit + extra, 1));
            let failed = matches!(result, Err(ClearingError::TransferFailed { .. }));
            prop_assert!(failed);
            prop_assert_eq!(ch.custody_balance(&token()), Decimal::from(deposit));
            prop_assert_eq!(ch.last_nonce(&user()), 0);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

/// Route ledger logs to the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn ledger_address() -> Address {
    Address::new([0xc1; 20])
}

fn token() -> TokenId {
    TokenId::new(Address::new([0x71; 20]))
}

fn user() -> Address {
    Address::new([0x11; 20])
}

fn custodian_key() -> Secp256k1Signer {
    Secp256k1Signer::from_bytes(&[0x0c; 32]).unwrap()
}

fn setup() -> (ClearingHouse, InMemoryTokens, Secp256k1Signer) {
    let key = custodian_key();
    let mut ch = ClearingHouse::new(ClearingHouseConfig::for_ledger(ledger_address()), key.address()).unwrap();
    ch.add_token(&key.address(), token()).unwrap();

    let mut tokens = InMemoryTokens::new();
    tokens.mint(&token(), &user(), Decimal::from(100)).unwrap();
    tokens.approve(&token(), &user(), &ledger_address(), Decimal::from(100));
    (ch, tokens, key)
}

fn authorize(key: &impl AuthorizationSigner, amount: i64, nonce: u64) -> WithdrawalAuthorization {
    key.authorize(&ledger_address(), token(), Decimal::from(amount), nonce, user())
        .unwrap()
}

fn fund(ch: &mut ClearingHouse, tokens: &mut InMemoryTokens, amount: Decimal) {
    ch.deposit(tokens, &user(), token(), RECEIVER, amount).unwrap();
}
