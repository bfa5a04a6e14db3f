//! Token registry: the whitelist of tokens eligible for deposit
//!
//! Entries are never deleted; removal flips `supported` to false so the
//! registry remembers every token it has seen. Custodian checks live in the
//! ledger, which owns both the registry and the access control.

use std::collections::BTreeMap;
use types::ids::TokenId;

#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    entries: BTreeMap<TokenId, bool>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a token supported. Idempotent.
    pub fn add(&mut self, token: TokenId) {
        self.entries.insert(token, true);
    }

    /// Mark a token unsupported. Unknown tokens get an unsupported entry.
    pub fn remove(&mut self, token: TokenId) {
        self.entries.insert(token, false);
    }

    /// Tokens not present are unsupported.
    pub fn is_supported(&self, token: &TokenId) -> bool {
        self.entries.get(token).copied().unwrap_or(false)
    }

    /// Supported tokens in ascending address order.
    pub fn supported(&self) -> Vec<TokenId> {
        self.entries
            .iter()
            .filter(|(_, supported)| **supported)
            .map(|(token, _)| *token)
            .collect()
    }
}
