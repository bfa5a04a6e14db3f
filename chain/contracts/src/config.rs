//! Clearing house configuration

use serde::{Deserialize, Serialize};
use types::ids::Address;

use crate::errors::ClearingError;

/// How deposits and withdrawals treat the amount argument.
///
/// Negative amounts are rejected under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountPolicy {
    /// Zero is rejected with `InvalidArgument`.
    #[default]
    RejectNonPositive,
    /// Zero is a valid transfer that moves nothing but still emits its event.
    AllowZero,
}

/// Configuration for a clearing house instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingHouseConfig {
    /// The ledger's own principal: holds custody and is bound into every
    /// withdrawal digest. Must not be the null address.
    pub ledger_address: Address,
    #[serde(default)]
    pub amount_policy: AmountPolicy,
    /// Retain at most this many events; unbounded when absent.
    #[serde(default)]
    pub max_event_log_len: Option<usize>,
}

impl Default for ClearingHouseConfig {
    fn default() -> Self {
        Self {
            ledger_address: Address::ZERO,
            amount_policy: AmountPolicy::default(),
            max_event_log_len: None,
        }
    }
}

impl ClearingHouseConfig {
    /// Default configuration for the ledger at `ledger_address`.
    pub fn for_ledger(ledger_address: Address) -> Self {
        Self {
            ledger_address,
            ..Self::default()
        }
    }

    /// Parse from JSON. Addresses are hex strings.
    pub fn from_json(json: &str) -> Result<Self, ClearingError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ClearingError::invalid_argument(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClearingError> {
        if self.ledger_address.is_zero() {
            return Err(ClearingError::invalid_argument(
                "ledger address must not be the null address",
            ));
        }
        if self.max_event_log_len == Some(0) {
            return Err(ClearingError::invalid_argument(
                "max_event_log_len must be positive when set",
            ));
        }
        Ok(())
    }
}
