//! Error types for identity parsing
//!
//! Kept separate from ledger errors so that parsing failures at the edge
//! (config files, event consumers) never masquerade as ledger rejections.

use thiserror::Error;

/// Identity parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid hex in address: {input}")]
    InvalidHex { input: String },

    #[error("Invalid address length: expected {expected} bytes, got {actual}")]
    InvalidAddressLength { expected: usize, actual: usize },

    #[error("Receiver identity must not be empty")]
    EmptyReceiver,
}
