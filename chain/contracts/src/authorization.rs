//! Withdrawal authorizations and their canonical digest
//!
//! The custodian signs, off-line, a digest binding the ledger, token, amount,
//! nonce and requester. Binding the ledger address stops an authorization
//! issued for one ledger from being redeemed at another ledger run by the
//! same custodian.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use types::ids::{Address, TokenId};
use types::numeric::{Amount, Nonce};

/// Domain tag prefixed to every withdrawal digest (frozen).
pub const WITHDRAW_DOMAIN: &[u8] = b"clearing-house:withdraw:v1";

/// A custodian-signed withdrawal request. Never persisted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalAuthorization {
    pub token: TokenId,
    pub amount: Amount,
    pub nonce: Nonce,
    /// Receives the funds, whoever submits the authorization.
    pub requester: Address,
    /// Scheme-specific signature bytes, hex in serialized form
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

impl WithdrawalAuthorization {
    /// Digest this authorization must have been signed over for `ledger`.
    pub fn digest(&self, ledger: &Address) -> [u8; 32] {
        withdrawal_digest(ledger, &self.token, self.amount, self.nonce, &self.requester)
    }
}

/// SHA-256 over the domain tag and the fixed-width fields.
///
/// Layout: `domain || ledger(20) || token(20) || amount(20) || nonce(8, BE)
/// || requester(20)`.
pub fn withdrawal_digest(
    ledger: &Address,
    token: &TokenId,
    amount: Amount,
    nonce: Nonce,
    requester: &Address,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(WITHDRAW_DOMAIN);
    hasher.update(ledger.as_bytes());
    hasher.update(token.address().as_bytes());
    hasher.update(canonical_amount_bytes(amount));
    hasher.update(nonce.to_be_bytes());
    hasher.update(requester.as_bytes());
    hasher.finalize().into()
}

/// Normalized mantissa (16 bytes, BE two's complement) followed by the
/// scale (4 bytes, BE). `40` and `40.00` encode identically.
fn canonical_amount_bytes(amount: Amount) -> [u8; 20] {
    let normalized = amount.normalize();
    let mut out = [0u8; 20];
    out[..16].copy_from_slice(&normalized.mantissa().to_be_bytes());
    out[16..].copy_from_slice(&normalized.scale().to_be_bytes());
    out
}
