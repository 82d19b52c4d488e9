//! Receipt data model and issuer-side primitives.
//!
//! `truthmine-receipt` defines the signed receipt document, its typed
//! claim tree, the deterministic canonical encoding signatures are
//! computed over, the trusted keyring model, and a local signer for
//! producing receipts.

pub mod canonical;
pub mod error;
pub mod keyring;
pub mod receipt;
pub mod signer;
pub mod value;

// Re-export primary types for convenience.
pub use canonical::EncodingError;
pub use error::ReceiptError;
pub use keyring::{Keyring, SignatureAlgorithm, TrustedKey};
pub use receipt::Receipt;
pub use value::{ClaimMap, ClaimValue};
