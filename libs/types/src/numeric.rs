//! Amount and nonce types
//!
//! Token amounts use rust_decimal for deterministic arithmetic; the signed
//! representation is what lets the ledger see and reject non-positive input.

use rust_decimal::Decimal;

/// Quantity of a fungible token.
pub type Amount = Decimal;

/// Per-requester withdrawal counter. The first usable value is 1.
pub type Nonce = u64;
