//! Error types for the verification subsystem.
//!
//! The taxonomy is deliberately split: [`TrustError`] covers failures the
//! orchestrator recovers into an `INVALID_SIGNATURE` verdict, while
//! [`VerifyError`] covers the only conditions that propagate to the
//! caller — encoder defects and caller misuse. Expected untrusted input
//! never raises; it resolves to a verdict.

use truthmine_receipt::EncodingError;

/// A signature could not even be checked against the keyring.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// The receipt names a key the keyring does not contain.
    #[error("unknown signer key `{key_id}`")]
    UnknownKey {
        /// The key id the receipt referenced.
        key_id: String,
    },

    /// The key exists but its validity window does not cover `now`.
    #[error("signer key `{key_id}` is outside its validity window")]
    KeyExpired {
        /// The expired key's id.
        key_id: String,
    },
}

/// Failures that abort verification and surface to the caller.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The receipt's claims have no canonical form.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Verifying against an empty keyring is caller misuse.
    #[error("trusted keyring is empty")]
    EmptyKeyring,

    /// A policy or receipt document failed to parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error loading a policy or receipt document.
    #[error("verification I/O error: {0}")]
    Io(#[from] std::io::Error),
}
