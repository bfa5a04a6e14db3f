//! Signature recovery and custodian signers
//!
//! The ledger only needs `SignatureVerifier::recover_signer`: given a digest
//! and signature bytes, name the principal that signed. Two schemes ship:
//!
//! - secp256k1 recoverable ECDSA, 65 bytes `r || s || v`. The signer address
//!   is `keccak256(uncompressed_pubkey[1..])[12..]`, as on Ethereum.
//! - ed25519, which has no key recovery. The signature is a 96-byte envelope
//!   `public_key || signature`, checked strictly under the embedded key. The
//!   signer address is `sha256(public_key)[12..]`.
//!
//! The signers are what a custodian's off-line process uses to issue
//! authorizations in the matching format.

use ed25519_dalek::{
    Signature as Ed25519Signature, Signer as _, SigningKey as Ed25519SigningKey,
    VerifyingKey as Ed25519VerifyingKey,
};
use k256::ecdsa::{
    RecoveryId, Signature as EcdsaSignature, SigningKey as EcdsaSigningKey,
    VerifyingKey as EcdsaVerifyingKey,
};
use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use types::ids::{Address, TokenId};
use types::numeric::{Amount, Nonce};

use crate::authorization::{withdrawal_digest, WithdrawalAuthorization};
use crate::errors::SignatureError;

/// Length of a recoverable secp256k1 signature.
pub const SECP256K1_SIGNATURE_LEN: usize = 65;

/// Length of an ed25519 `public_key || signature` envelope.
pub const ED25519_ENVELOPE_LEN: usize = 96;

/// Recovers the principal that signed a digest.
///
/// Must be deterministic. Malformed input is an error, never an address.
pub trait SignatureVerifier {
    fn recover_signer(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError>;
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for Box<V> {
    fn recover_signer(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError> {
        (**self).recover_signer(digest, signature)
    }
}

/// Produces signatures a matching `SignatureVerifier` recovers to `address()`.
pub trait AuthorizationSigner {
    fn address(&self) -> Address;

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignatureError>;

    /// Issue a withdrawal authorization redeemable at `ledger`.
    fn authorize(
        &self,
        ledger: &Address,
        token: TokenId,
        amount: Amount,
        nonce: Nonce,
        requester: Address,
    ) -> Result<WithdrawalAuthorization, SignatureError> {
        let digest = withdrawal_digest(ledger, &token, amount, nonce, &requester);
        Ok(WithdrawalAuthorization {
            token,
            amount,
            nonce,
            requester,
            signature: self.sign_digest(&digest)?,
        })
    }
}

// ---------------------------------------------------------------------------
// secp256k1
// ---------------------------------------------------------------------------

/// Address of a secp256k1 public key.
pub fn secp256k1_address(key: &EcdsaVerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    // Skip the 0x04 prefix byte, hash the 64 bytes of (x, y).
    let hash: [u8; 32] = Keccak256::digest(&encoded.as_bytes()[1..]).into();
    Address::from_hash_tail(&hash)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn recover_signer(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError> {
        if signature.len() != SECP256K1_SIGNATURE_LEN {
            return Err(SignatureError::InvalidLength {
                expected: SECP256K1_SIGNATURE_LEN,
                actual: signature.len(),
            });
        }

        let sig = EcdsaSignature::from_slice(&signature[..64])
            .map_err(|_| SignatureError::Malformed)?;
        // A high-s twin of a valid signature recovers the same key; refuse it.
        if sig.normalize_s().is_some() {
            return Err(SignatureError::NonCanonical);
        }

        let v = signature[64];
        let recovery_byte = match v {
            0 | 1 => v,
            27 | 28 => v - 27,
            other => return Err(SignatureError::InvalidRecoveryId(other)),
        };
        let recovery_id =
            RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::InvalidRecoveryId(v))?;

        let key = EcdsaVerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
            .map_err(|_| SignatureError::RecoveryFailed)?;
        Ok(secp256k1_address(&key))
    }
}

/// secp256k1 custodian key.
pub struct Secp256k1Signer {
    key: EcdsaSigningKey,
    address: Address,
}

impl Secp256k1Signer {
    /// Build from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, SignatureError> {
        let key = EcdsaSigningKey::from_slice(secret).map_err(|_| SignatureError::InvalidSigningKey)?;
        let address = secp256k1_address(key.verifying_key());
        Ok(Self { key, address })
    }
}

impl AuthorizationSigner for Secp256k1Signer {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignatureError> {
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(SECP256K1_SIGNATURE_LEN);
        out.extend_from_slice(&sig.to_bytes());
        out.push(recovery_id.to_byte() + 27); // Ethereum v encoding
        Ok(out)
    }
}

impl std::fmt::Debug for Secp256k1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ed25519
// ---------------------------------------------------------------------------

/// Address of an ed25519 public key.
pub fn ed25519_address(key: &Ed25519VerifyingKey) -> Address {
    let hash: [u8; 32] = Sha256::digest(key.as_bytes()).into();
    Address::from_hash_tail(&hash)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519EnvelopeVerifier;

impl SignatureVerifier for Ed25519EnvelopeVerifier {
    fn recover_signer(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError> {
        if signature.len() != ED25519_ENVELOPE_LEN {
            return Err(SignatureError::InvalidLength {
                expected: ED25519_ENVELOPE_LEN,
                actual: signature.len(),
            });
        }

        let key_bytes: [u8; 32] = signature[..32]
            .try_into()
            .map_err(|_| SignatureError::Malformed)?;
        let sig_bytes: [u8; 64] = signature[32..]
            .try_into()
            .map_err(|_| SignatureError::Malformed)?;

        let key = Ed25519VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| SignatureError::InvalidPublicKey)?;
        let sig = Ed25519Signature::from_bytes(&sig_bytes);

        key.verify_strict(digest, &sig)
            .map_err(|_| SignatureError::VerificationFailed)?;
        Ok(ed25519_address(&key))
    }
}

/// ed25519 custodian key.
pub struct Ed25519Signer {
    key: Ed25519SigningKey,
}

impl Ed25519Signer {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: Ed25519SigningKey::from_bytes(secret),
        }
    }
}

impl AuthorizationSigner for Ed25519Signer {
    fn address(&self) -> Address {
        ed25519_address(&self.key.verifying_key())
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignatureError> {
        let sig = self.key.sign(digest);
        let mut out = Vec::with_capacity(ED25519_ENVELOPE_LEN);
        out.extend_from_slice(self.key.verifying_key().as_bytes());
        out.extend_from_slice(&sig.to_bytes());
        Ok(out)
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
