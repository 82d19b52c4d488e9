//! Error types for the receipt subsystem.

use crate::canonical::EncodingError;

/// Errors from receipt construction, signing, and key handling.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// Canonical encoding failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Failed to serialize or parse a receipt document.
    #[error("receipt serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Cryptographic key operation failed (load, generate, or parse).
    #[error("key error: {0}")]
    Key(String),

    /// Signing operation failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// I/O error during receipt operations.
    #[error("receipt I/O error: {0}")]
    Io(#[from] std::io::Error),
}
