//! Custodial clearing house for whitelisted fungible tokens
//!
//! Depositors move tokens into ledger custody, tagged with an opaque external
//! receiver identity. Funds leave custody only against a single-use
//! authorization signed by the custodian.
//!
//! # Modules
//! - `clearing`: The ledger itself: deposit, withdraw, custody accounting
//! - `shared`: Thread-safe handle serializing every operation
//! - `registry`: Token whitelist
//! - `security`: Custodian access control and per-requester nonces
//! - `authorization`: Withdrawal authorizations and their signed digest
//! - `signing`: secp256k1 and ed25519 signer recovery and signers
//! - `token`: Fungible token capability and an in-memory implementation
//! - `events`: Contract events and the append-only event log
//! - `config`: Instance configuration
//! - `errors`: Error taxonomy

pub mod authorization;
pub mod clearing;
pub mod config;
pub mod errors;
pub mod events;
pub mod registry;
pub mod security;
pub mod shared;
pub mod signing;
pub mod token;

pub use authorization::{withdrawal_digest, WithdrawalAuthorization};
pub use clearing::{ClearingHouse, Reconciliation};
pub use config::{AmountPolicy, ClearingHouseConfig};
pub use errors::{ClearingError, SignatureError, TokenError};
pub use events::{ContractEvent, EventLog, EventRecord};
pub use shared::SharedClearingHouse;
pub use signing::{
    AuthorizationSigner, Ed25519EnvelopeVerifier, Ed25519Signer, Secp256k1Signer,
    Secp256k1Verifier, SignatureVerifier,
};
pub use token::{FungibleToken, InMemoryTokens};

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
