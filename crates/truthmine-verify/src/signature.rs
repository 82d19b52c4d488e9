//! Signature verification against a trusted keyring.
//!
//! Trust failures (unknown or out-of-window keys) are [`TrustError`]s;
//! a signature that is simply wrong returns `Ok(false)` — an expected
//! outcome, not an exceptional one. `aws-lc-rs` performs the actual
//! verification, which is constant-time with respect to secret material.

use aws_lc_rs::signature::{ECDSA_P256_SHA256_ASN1, ED25519, UnparsedPublicKey};
use chrono::{DateTime, Utc};
use truthmine_receipt::{Keyring, SignatureAlgorithm};

use crate::error::TrustError;

/// Verify `signature` over `canonical_bytes` with the keyring entry
/// named by `signer_key_id`.
///
/// # Errors
///
/// Returns [`TrustError::UnknownKey`] when the keyring has no such key,
/// [`TrustError::KeyExpired`] when `now` is outside the key's validity
/// window. A cryptographically wrong (or malformed) signature is
/// `Ok(false)`.
pub fn verify_signature(
    canonical_bytes: &[u8],
    signature: &[u8],
    signer_key_id: &str,
    keyring: &Keyring,
    now: DateTime<Utc>,
) -> Result<bool, TrustError> {
    let key = keyring.get(signer_key_id).ok_or_else(|| TrustError::UnknownKey {
        key_id: signer_key_id.to_owned(),
    })?;

    if !key.valid_at(now) {
        return Err(TrustError::KeyExpired {
            key_id: signer_key_id.to_owned(),
        });
    }

    let algorithm: &'static dyn aws_lc_rs::signature::VerificationAlgorithm = match key.algorithm {
        SignatureAlgorithm::Ed25519 => &ED25519,
        SignatureAlgorithm::EcdsaP256 => &ECDSA_P256_SHA256_ASN1,
    };

    let public_key = UnparsedPublicKey::new(algorithm, &key.public_key_material);
    let verified = public_key.verify(canonical_bytes, signature).is_ok();
    tracing::debug!(
        key_id = signer_key_id,
        algorithm = key.algorithm.as_str(),
        verified,
        "signature check"
    );
    Ok(verified)
}
