//! Shared security primitives for the clearing ledger
//!
//! Custodian access control and the per-requester nonce ledger that makes
//! withdrawal authorizations single-use.

use std::collections::HashMap;
use types::ids::Address;
use types::numeric::Nonce;

use crate::errors::ClearingError;

/// Single-custodian access control.
///
/// The custodian manages the token whitelist and signs withdrawal
/// authorizations. It is never the null address.
#[derive(Debug, Clone)]
pub struct AccessControl {
    custodian: Address,
}

impl AccessControl {
    /// Create access control with an initial custodian.
    pub fn new(custodian: Address) -> Result<Self, ClearingError> {
        if custodian.is_zero() {
            return Err(ClearingError::invalid_argument(
                "custodian must not be the null address",
            ));
        }
        Ok(Self { custodian })
    }

    /// Get the current custodian.
    pub fn custodian(&self) -> Address {
        self.custodian
    }

    /// Check if a principal is the custodian.
    pub fn is_custodian(&self, principal: &Address) -> bool {
        self.custodian == *principal
    }

    /// Fail with `Unauthorized` unless `caller` is the custodian.
    pub fn ensure_custodian(&self, caller: &Address) -> Result<(), ClearingError> {
        if !self.is_custodian(caller) {
            return Err(ClearingError::unauthorized(format!(
                "{} is not the custodian",
                caller
            )));
        }
        Ok(())
    }

    /// Hand the custodian role to `new_custodian`. Returns the previous one.
    pub fn transfer(
        &mut self,
        caller: &Address,
        new_custodian: Address,
    ) -> Result<Address, ClearingError> {
        self.ensure_custodian(caller)?;
        if new_custodian.is_zero() {
            return Err(ClearingError::invalid_argument(
                "new custodian must not be the null address",
            ));
        }
        let previous = self.custodian;
        self.custodian = new_custodian;
        Ok(previous)
    }
}

/// Last-used nonce per requester.
///
/// A requester with no record has implicitly used nonce 0, so the first
/// acceptable nonce is 1. Records only move forward.
#[derive(Debug, Clone, Default)]
pub struct NonceLedger {
    last_used: HashMap<Address, Nonce>,
}

impl NonceLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last nonce accepted for `requester`, 0 if none.
    pub fn last_used(&self, requester: &Address) -> Nonce {
        self.last_used.get(requester).copied().unwrap_or(0)
    }

    /// Validate `nonce` against the record without changing it.
    pub fn check(&self, requester: &Address, nonce: Nonce) -> Result<(), ClearingError> {
        let last_used = self.last_used(requester);
        if nonce <= last_used {
            return Err(ClearingError::InvalidNonce {
                requester: *requester,
                provided: nonce,
                last_used,
            });
        }
        Ok(())
    }

    /// Record `nonce` as the last one used by `requester`.
    ///
    /// Call only after [`NonceLedger::check`] passed for the same nonce and
    /// the withdrawal it guards has completed.
    pub fn record(&mut self, requester: &Address, nonce: Nonce) {
        self.last_used.insert(*requester, nonce);
    }
}
