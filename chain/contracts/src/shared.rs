//! Thread-safe handle over a clearing house and its token capability
//!
//! One mutex guards both the ledger state and the token balances, so every
//! operation runs to completion before the next one starts. Two withdrawals
//! racing on the same requester and nonce therefore resolve to exactly one
//! success and one `InvalidNonce`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use types::ids::{Address, TokenId};
use types::numeric::{Amount, Nonce};

use crate::authorization::WithdrawalAuthorization;
use crate::clearing::{ClearingHouse, Reconciliation};
use crate::errors::ClearingError;
use crate::events::{ContractEvent, EventRecord};
use crate::signing::{Secp256k1Verifier, SignatureVerifier};
use crate::token::FungibleToken;

#[derive(Debug)]
struct Inner<V, T> {
    ledger: ClearingHouse<V>,
    tokens: T,
}

/// Cloneable, `Send + Sync` handle. Clones share the same state.
#[derive(Debug)]
pub struct SharedClearingHouse<V = Secp256k1Verifier, T = crate::token::InMemoryTokens> {
    inner: Arc<Mutex<Inner<V, T>>>,
}

impl<V, T> Clone for SharedClearingHouse<V, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: SignatureVerifier, T: FungibleToken> SharedClearingHouse<V, T> {
    pub fn new(ledger: ClearingHouse<V>, tokens: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { ledger, tokens })),
        }
    }

    // Operations write ledger state only after every token call has
    // returned, so a panicking token leaves the guarded state untouched and
    // a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Inner<V, T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_token(&self, caller: &Address, token: TokenId) -> Result<ContractEvent, ClearingError> {
        self.lock().ledger.add_token(caller, token)
    }

    pub fn remove_token(&self, caller: &Address, token: TokenId) -> Result<ContractEvent, ClearingError> {
        self.lock().ledger.remove_token(caller, token)
    }

    pub fn transfer_custodian(
        &self,
        caller: &Address,
        new_custodian: Address,
    ) -> Result<ContractEvent, ClearingError> {
        self.lock().ledger.transfer_custodian(caller, new_custodian)
    }

    pub fn deposit(
        &self,
        caller: &Address,
        token: TokenId,
        receiver: &str,
        amount: Amount,
    ) -> Result<ContractEvent, ClearingError> {
        let mut guard = self.lock();
        let Inner { ledger, tokens } = &mut *guard;
        ledger.deposit(tokens, caller, token, receiver, amount)
    }

    pub fn withdraw(
        &self,
        caller: &Address,
        authorization: &WithdrawalAuthorization,
    ) -> Result<ContractEvent, ClearingError> {
        let mut guard = self.lock();
        let Inner { ledger, tokens } = &mut *guard;
        ledger.withdraw(tokens, caller, authorization)
    }

    pub fn is_supported(&self, token: &TokenId) -> bool {
        self.lock().ledger.is_supported(token)
    }

    pub fn custody_balance(&self, token: &TokenId) -> Amount {
        self.lock().ledger.custody_balance(token)
    }

    pub fn last_nonce(&self, requester: &Address) -> Nonce {
        self.lock().ledger.last_nonce(requester)
    }

    pub fn reconcile(&self, token: &TokenId) -> Reconciliation {
        let guard = self.lock();
        guard.ledger.reconcile(&guard.tokens, token)
    }

    pub fn events_since(&self, cursor: u64) -> Vec<EventRecord> {
        self.lock().ledger.events_since(cursor)
    }

    pub fn drain_events(&self) -> Vec<EventRecord> {
        self.lock().ledger.drain_events()
    }

    /// Run `f` against the token capability under the lock (minting,
    /// approvals, pausing).
    pub fn with_tokens<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock().tokens)
    }

    /// Run `f` against the ledger under the lock.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&ClearingHouse<V>) -> R) -> R {
        f(&self.lock().ledger)
    }
}
