//! Clearing house: custody ledger for whitelisted fungible tokens
//!
//! - Token whitelist, mutated only by the custodian
//! - Deposits pulled from the caller into custody, tagged with an opaque
//!   external receiver
//! - Withdrawals released against single-use custodian authorizations
//! - Custody accounting per token, reconcilable against the token capability
//! - Append-only event log
//!
//! Every operation either completes or leaves the registry, custody balances
//! and nonce records exactly as they were.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use types::ids::{Address, ReceiverId, TokenId};
use types::numeric::{Amount, Nonce};

use crate::authorization::WithdrawalAuthorization;
use crate::config::{AmountPolicy, ClearingHouseConfig};
use crate::errors::ClearingError;
use crate::events::{
    ContractEvent, CustodianTransferred, EventLog, EventRecord, TokenAdded, TokenRemoved,
    TokensUnwrapped, TokensWrapped,
};
use crate::registry::TokenRegistry;
use crate::security::{AccessControl, NonceLedger};
use crate::signing::{Secp256k1Verifier, SignatureVerifier};
use crate::token::FungibleToken;

/// Custody figure for one token compared with what the token says the
/// ledger actually holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub token: TokenId,
    pub recorded: Amount,
    pub actual: Amount,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.recorded == self.actual
    }
}

/// Custodial clearing ledger.
///
/// Token balances live in a `FungibleToken` capability passed to each
/// operation that moves funds; the ledger keeps the custody accounting.
/// Withdrawal signatures are recovered by `V`.
#[derive(Debug)]
pub struct ClearingHouse<V = Secp256k1Verifier> {
    config: ClearingHouseConfig,
    access_control: AccessControl,
    registry: TokenRegistry,
    nonces: NonceLedger,
    /// Net deposited minus withdrawn, per token
    custody: BTreeMap<TokenId, Amount>,
    verifier: V,
    events: EventLog,
}

impl ClearingHouse<Secp256k1Verifier> {
    /// Create a ledger that accepts secp256k1 custodian signatures.
    pub fn new(config: ClearingHouseConfig, custodian: Address) -> Result<Self, ClearingError> {
        Self::with_verifier(config, custodian, Secp256k1Verifier)
    }
}

impl<V: SignatureVerifier> ClearingHouse<V> {
    /// Create a ledger with a custom signature scheme.
    pub fn with_verifier(
        config: ClearingHouseConfig,
        custodian: Address,
        verifier: V,
    ) -> Result<Self, ClearingError> {
        config.validate()?;
        let access_control = AccessControl::new(custodian)?;
        let events = match config.max_event_log_len {
            Some(max_len) => EventLog::with_capacity_limit(max_len),
            None => EventLog::new(),
        };

        info!(
            ledger = %config.ledger_address,
            %custodian,
            amount_policy = ?config.amount_policy,
            "ClearingHouse initialized"
        );

        Ok(Self {
            config,
            access_control,
            registry: TokenRegistry::new(),
            nonces: NonceLedger::new(),
            custody: BTreeMap::new(),
            verifier,
            events,
        })
    }

    // ───────────────────────── Identity ─────────────────────────

    /// The ledger's own principal.
    pub fn address(&self) -> Address {
        self.config.ledger_address
    }

    pub fn config(&self) -> &ClearingHouseConfig {
        &self.config
    }

    pub fn custodian(&self) -> Address {
        self.access_control.custodian()
    }

    /// Hand the custodian role over. Custodian-only.
    ///
    /// Authorizations signed by the previous custodian stop being redeemable.
    pub fn transfer_custodian(
        &mut self,
        caller: &Address,
        new_custodian: Address,
    ) -> Result<ContractEvent, ClearingError> {
        let previous = self
            .access_control
            .transfer(caller, new_custodian)
            .inspect_err(|e| warn!(%caller, %new_custodian, error = %e, "custodian transfer rejected"))?;

        info!(%previous, new = %new_custodian, "custodian transferred");
        Ok(self.emit(ContractEvent::CustodianTransferred(CustodianTransferred {
            previous,
            new: new_custodian,
        })))
    }

    // ───────────────────────── Token Registry ─────────────────────────

    /// Whitelist a token. Custodian-only; idempotent, emits every time.
    pub fn add_token(&mut self, caller: &Address, token: TokenId) -> Result<ContractEvent, ClearingError> {
        self.access_control
            .ensure_custodian(caller)
            .inspect_err(|e| warn!(%caller, %token, error = %e, "add_token rejected"))?;

        self.registry.add(token);
        info!(%token, "token added");
        Ok(self.emit(ContractEvent::TokenAdded(TokenAdded { token })))
    }

    /// De-list a token. Custodian-only.
    ///
    /// Blocks new deposits only; custody already held stays withdrawable.
    pub fn remove_token(&mut self, caller: &Address, token: TokenId) -> Result<ContractEvent, ClearingError> {
        self.access_control
            .ensure_custodian(caller)
            .inspect_err(|e| warn!(%caller, %token, error = %e, "remove_token rejected"))?;

        self.registry.remove(token);
        info!(%token, "token removed");
        Ok(self.emit(ContractEvent::TokenRemoved(TokenRemoved { token })))
    }

    pub fn is_supported(&self, token: &TokenId) -> bool {
        self.registry.is_supported(token)
    }

    pub fn supported_tokens(&self) -> Vec<TokenId> {
        self.registry.supported()
    }

    // ───────────────────────── Deposit ─────────────────────────

    /// Pull `amount` of `token` from `caller` into custody for `receiver`.
    ///
    /// `caller` must have approved the ledger address beforehand. Emits
    /// `TokensWrapped`.
    pub fn deposit<T: FungibleToken + ?Sized>(
        &mut self,
        tokens: &mut T,
        caller: &Address,
        token: TokenId,
        receiver: &str,
        amount: Amount,
    ) -> Result<ContractEvent, ClearingError> {
        if !self.registry.is_supported(&token) {
            warn!(%caller, %token, "deposit of unsupported token");
            return Err(ClearingError::UnsupportedToken { token });
        }
        self.check_amount(amount)?;
        if *caller == self.address() {
            warn!(%token, "deposit from the ledger's own address");
            return Err(ClearingError::invalid_argument(
                "the ledger cannot deposit into its own custody",
            ));
        }
        let receiver = ReceiverId::new(receiver)
            .map_err(|e| ClearingError::invalid_argument(e.to_string()))?;

        // Compute the new custody figure before moving anything, so an
        // overflow cannot strand tokens that were already pulled.
        let credited = self
            .custody_balance(&token)
            .checked_add(amount)
            .ok_or_else(|| ClearingError::invalid_argument("custody balance overflow"))?;

        let ledger = self.address();
        tokens
            .transfer_from(&token, &ledger, caller, &ledger, amount)
            .map_err(|e| {
                warn!(%caller, %token, %amount, error = %e, "deposit transfer failed");
                ClearingError::transfer_failed(token, e)
            })?;

        self.custody.insert(token, credited);
        info!(%caller, %token, %receiver, %amount, "tokens wrapped");
        Ok(self.emit(ContractEvent::TokensWrapped(TokensWrapped {
            token,
            receiver,
            amount,
        })))
    }

    // ───────────────────────── Withdraw ─────────────────────────

    /// Release custody against a custodian authorization.
    ///
    /// Funds always go to `authorization.requester`; `caller` may be a
    /// relayer and receives nothing. No whitelist check: de-listed tokens
    /// stay withdrawable. Emits `TokensUnwrapped`.
    pub fn withdraw<T: FungibleToken + ?Sized>(
        &mut self,
        tokens: &mut T,
        caller: &Address,
        authorization: &WithdrawalAuthorization,
    ) -> Result<ContractEvent, ClearingError> {
        let WithdrawalAuthorization {
            token,
            amount,
            nonce,
            requester,
            ..
        } = *authorization;
        self.check_amount(amount)?;
        if requester == self.address() {
            warn!(%caller, %token, nonce, "withdrawal to the ledger's own address");
            return Err(ClearingError::invalid_argument(
                "the ledger cannot be the withdrawal requester",
            ));
        }

        let digest = authorization.digest(&self.address());
        let signer = self
            .verifier
            .recover_signer(&digest, &authorization.signature)
            .map_err(|e| {
                warn!(%caller, %requester, %token, error = %e, "withdrawal signature rejected");
                ClearingError::unauthorized(format!("signature rejected: {}", e))
            })?;
        if !self.access_control.is_custodian(&signer) {
            warn!(%caller, %requester, %signer, "withdrawal not signed by custodian");
            return Err(ClearingError::unauthorized(format!(
                "signer {} is not the custodian",
                signer
            )));
        }

        self.nonces.check(&requester, nonce).inspect_err(|e| {
            warn!(%caller, %requester, nonce, error = %e, "withdrawal nonce rejected")
        })?;

        // The nonce is written only once the tokens have moved, so a failing
        // or panicking token leaves the authorization redeemable.
        self.release(tokens, &token, &requester, amount)
            .inspect_err(|e| warn!(%requester, %token, %amount, nonce, error = %e, "withdrawal release failed"))?;
        self.nonces.record(&requester, nonce);

        info!(%caller, %requester, %token, %amount, nonce, "tokens unwrapped");
        Ok(self.emit(ContractEvent::TokensUnwrapped(TokensUnwrapped {
            token,
            requester,
            amount,
            nonce,
        })))
    }

    /// Move custody out to `to` and debit the accounting. Ledger state is
    /// written only after the token call returns `Ok`.
    fn release<T: FungibleToken + ?Sized>(
        &mut self,
        tokens: &mut T,
        token: &TokenId,
        to: &Address,
        amount: Amount,
    ) -> Result<(), ClearingError> {
        let held = self.custody_balance(token);
        if held < amount {
            return Err(ClearingError::transfer_failed(
                *token,
                format!("custody holds {}, requested {}", held, amount),
            ));
        }

        tokens
            .transfer(token, &self.address(), to, amount)
            .map_err(|e| ClearingError::transfer_failed(*token, e))?;

        self.custody.insert(*token, held - amount);
        Ok(())
    }

    // ───────────────────────── Queries ─────────────────────────

    /// Net amount of `token` in custody according to the ledger.
    pub fn custody_balance(&self, token: &TokenId) -> Amount {
        self.custody.get(token).copied().unwrap_or(Amount::ZERO)
    }

    /// Last nonce redeemed by `requester`, 0 if none.
    pub fn last_nonce(&self, requester: &Address) -> Nonce {
        self.nonces.last_used(requester)
    }

    /// Compare the custody figure for `token` with the ledger's balance in
    /// the token capability.
    pub fn reconcile<T: FungibleToken + ?Sized>(&self, tokens: &T, token: &TokenId) -> Reconciliation {
        let reconciliation = Reconciliation {
            token: *token,
            recorded: self.custody_balance(token),
            actual: tokens.balance_of(token, &self.address()),
        };
        debug!(
            %token,
            recorded = %reconciliation.recorded,
            actual = %reconciliation.actual,
            "reconciled custody"
        );
        reconciliation
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Events emitted after sequence number `cursor`.
    pub fn events_since(&self, cursor: u64) -> Vec<EventRecord> {
        self.events.since(cursor)
    }

    /// Drain all retained events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    fn emit(&mut self, event: ContractEvent) -> ContractEvent {
        let sequence = self.events.append(event.clone());
        debug!(sequence, event = event.name(), "event emitted");
        event
    }

    // ───────────────────────── Internal Guards ─────────────────────────

    fn check_amount(&self, amount: Amount) -> Result<(), ClearingError> {
        let accepted = match self.config.amount_policy {
            AmountPolicy::RejectNonPositive => amount > Amount::ZERO,
            AmountPolicy::AllowZero => amount >= Amount::ZERO,
        };
        if !accepted {
            return Err(ClearingError::invalid_argument(format!(
                "amount must be {}, got {}",
                match self.config.amount_policy {
                    AmountPolicy::RejectNonPositive => "positive",
                    AmountPolicy::AllowZero => "non-negative",
                },
                amount
            )));
        }
        Ok(())
    }
}
