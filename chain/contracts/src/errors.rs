//! Contract-specific error types
//!
//! `ClearingError` is the taxonomy every ledger operation reports. The
//! collaborator errors (`TokenError`, `SignatureError`) are what the token
//! capability and signature verifiers return; the ledger folds them into
//! `TransferFailed` and `Unauthorized` at the call site.

use thiserror::Error;
use types::ids::{Address, TokenId};
use types::numeric::Amount;

/// Ledger operation errors.
///
/// Every variant is terminal for the operation that produced it, and the
/// ledger state is exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClearingError {
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Unsupported token: {token}")]
    UnsupportedToken { token: TokenId },

    #[error("Invalid nonce for {requester}: provided {provided}, last used {last_used}")]
    InvalidNonce {
        requester: Address,
        provided: u64,
        last_used: u64,
    },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Transfer of {token} failed: {reason}")]
    TransferFailed { token: TokenId, reason: String },
}

impl ClearingError {
    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn transfer_failed(token: TokenId, reason: impl ToString) -> Self {
        Self::TransferFailed {
            token,
            reason: reason.to_string(),
        }
    }
}

/// Errors reported by a fungible token capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Insufficient balance for {holder}: required {required}, available {available}")]
    InsufficientBalance {
        holder: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance from {owner} to {spender}: required {required}, available {available}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Token is paused: {token}")]
    Paused { token: TokenId },

    #[error("Negative amount: {amount}")]
    NegativeAmount { amount: Amount },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Errors reported while producing or recovering a signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid signature length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("Malformed signature")]
    Malformed,

    #[error("Non-canonical (high-s) signature")]
    NonCanonical,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid signing key")]
    InvalidSigningKey,

    #[error("Signer recovery failed")]
    RecoveryFailed,

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}
