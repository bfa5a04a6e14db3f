//! Shared types for the clearing house
//!
//! Identity and amount types used by the ledger and by anything that talks
//! to it (signers, indexers reading events, configuration loaders).
//!
//! # Modules
//! - `ids`: Principal addresses, token identifiers, receiver identities
//! - `numeric`: Amount and nonce types
//! - `errors`: Identity parsing errors

pub mod errors;
pub mod ids;
pub mod numeric;

pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
}
