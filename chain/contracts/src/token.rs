//! Fungible token capability
//!
//! The ledger never holds token balances itself; it moves them through a
//! `FungibleToken` implementation keyed by `TokenId`. Every call may fail
//! and the ledger handles each failure explicitly.
//!
//! `InMemoryTokens` is a reference implementation with balances, allowances,
//! minting and a per-token pause switch, for tests and simulations.

use std::collections::{HashMap, HashSet};
use tracing::debug;
use types::ids::{Address, TokenId};
use types::numeric::Amount;

use crate::errors::TokenError;

/// Token movement as seen from the ledger.
pub trait FungibleToken {
    /// Pull `amount` from `owner` to `recipient`, spending `spender`'s
    /// allowance. Fails without side effects if balance or allowance is short.
    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &Address,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `amount` held by `from` to `to`.
    fn transfer(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Balance of `holder` in `token`.
    fn balance_of(&self, token: &TokenId, holder: &Address) -> Amount;
}

/// In-memory fungible tokens.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokens {
    balances: HashMap<(TokenId, Address), Amount>,
    allowances: HashMap<(TokenId, Address, Address), Amount>,
    paused: HashSet<TokenId>,
}

impl InMemoryTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `token` to `to` out of thin air.
    pub fn mint(&mut self, token: &TokenId, to: &Address, amount: Amount) -> Result<(), TokenError> {
        Self::ensure_non_negative(amount)?;
        let balance = self.balances.entry((*token, *to)).or_default();
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        debug!(%token, %to, %amount, "minted");
        Ok(())
    }

    /// Set the allowance `owner` grants `spender`, replacing any previous one.
    pub fn approve(&mut self, token: &TokenId, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances.insert((*token, *owner, *spender), amount);
    }

    pub fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Reject every movement of `token` until unpaused.
    pub fn pause(&mut self, token: &TokenId) {
        self.paused.insert(*token);
    }

    pub fn unpause(&mut self, token: &TokenId) {
        self.paused.remove(token);
    }

    fn ensure_non_negative(amount: Amount) -> Result<(), TokenError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(TokenError::NegativeAmount { amount });
        }
        Ok(())
    }

    fn ensure_not_paused(&self, token: &TokenId) -> Result<(), TokenError> {
        if self.paused.contains(token) {
            return Err(TokenError::Paused { token: *token });
        }
        Ok(())
    }

    /// Move a balance. Checks everything before touching either side.
    fn move_balance(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert((*token, *from), available - amount);
        self.balances.insert((*token, *to), credited);
        Ok(())
    }
}

impl FungibleToken for InMemoryTokens {
    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &Address,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        Self::ensure_non_negative(amount)?;
        self.ensure_not_paused(token)?;

        let allowance = self.allowance(token, owner, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                required: amount,
                available: allowance,
            });
        }

        self.move_balance(token, owner, recipient, amount)?;
        self.allowances
            .insert((*token, *owner, *spender), allowance - amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        Self::ensure_non_negative(amount)?;
        self.ensure_not_paused(token)?;
        self.move_balance(token, from, to, amount)
    }

    fn balance_of(&self, token: &TokenId, holder: &Address) -> Amount {
        self.balances
            .get(&(*token, *holder))
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}
