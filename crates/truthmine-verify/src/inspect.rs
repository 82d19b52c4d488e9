//! Human-readable receipt display.
//!
//! Extracts key fields from a receipt document and formats them for
//! terminal output, including the SHA-256 digest of the canonical
//! encoding (the bytes the signature covers).

use std::fmt::Write;

use sha2::{Digest, Sha256};
use truthmine_receipt::{ClaimValue, Receipt};

use crate::error::VerifyError;

/// Extracted summary of a receipt.
#[derive(Debug)]
pub struct ReceiptSummary {
    /// The subject identifier.
    pub subject: String,
    /// The signer key id.
    pub signer_key_id: String,
    /// Number of top-level claims.
    pub claim_count: usize,
    /// Hex SHA-256 of the canonical encoding.
    pub canonical_sha256: String,
    /// Top-level claim names with their types, in document order.
    pub claim_types: Vec<(String, &'static str)>,
}

/// Compute the SHA-256 hex digest of a byte slice.
#[must_use]
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Summarize a receipt for display.
///
/// # Errors
///
/// Returns [`VerifyError::Encoding`] if the claims cannot be canonically
/// encoded (the digest would be meaningless).
pub fn summarize(receipt: &Receipt) -> Result<ReceiptSummary, VerifyError> {
    let canonical = receipt.canonical_bytes()?;
    Ok(ReceiptSummary {
        subject: receipt.subject.clone(),
        signer_key_id: receipt.signer_key_id.clone(),
        claim_count: receipt.claims.len(),
        canonical_sha256: sha256_bytes(&canonical),
        claim_types: receipt
            .claims
            .iter()
            .map(|(k, v)| (k.to_owned(), v.type_name()))
            .collect(),
    })
}

/// Format a summary as a human-readable string.
#[must_use]
pub fn format_summary(summary: &ReceiptSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Receipt Summary");
    let _ = writeln!(out, "---------------");
    let _ = writeln!(out, "Subject:          {}", summary.subject);
    let _ = writeln!(out, "Signer key:       {}", summary.signer_key_id);
    let _ = writeln!(out, "Claims:           {}", summary.claim_count);
    let _ = writeln!(out, "Canonical digest: sha256:{}", summary.canonical_sha256);
    if !summary.claim_types.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Claim types:");
        for (name, ty) in &summary.claim_types {
            let _ = writeln!(out, "  {name}: {ty}");
        }
    }
    out
}

/// Format a detailed view: summary plus the full claim tree.
///
/// # Errors
///
/// Same failure modes as [`summarize`].
pub fn format_detailed(receipt: &Receipt) -> Result<String, VerifyError> {
    let summary = summarize(receipt)?;
    let mut out = format_summary(&summary);
    let _ = writeln!(out);
    let _ = writeln!(out, "Claims:");
    for (name, value) in receipt.claims.iter() {
        let _ = writeln!(out, "  {name} = {}", render_value(value));
    }
    Ok(out)
}

fn render_value(value: &ClaimValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("<{}>", value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use truthmine_receipt::ClaimMap;

    fn sample_receipt() -> Receipt {
        let mut claims = ClaimMap::new();
        claims.insert("role", "admin");
        claims.insert("level", 3);
        Receipt {
            subject: "alice".to_owned(),
            claims,
            signer_key_id: "k1".to_owned(),
            signature: vec![1, 2, 3],
        }
    }

    #[test]
    fn sha256_known_value() {
        // SHA-256 of empty string
        assert_eq!(
            sha256_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn summary_counts_claims() {
        let summary = summarize(&sample_receipt()).expect("summarize");
        assert_eq!(summary.subject, "alice");
        assert_eq!(summary.signer_key_id, "k1");
        assert_eq!(summary.claim_count, 2);
        assert_eq!(summary.canonical_sha256.len(), 64);
        assert_eq!(summary.claim_types[0], ("role".to_owned(), "string"));
        assert_eq!(summary.claim_types[1], ("level".to_owned(), "int"));
    }

    #[test]
    fn digest_tracks_claim_changes() {
        let a = summarize(&sample_receipt()).unwrap().canonical_sha256;
        let mut receipt = sample_receipt();
        receipt.claims.insert("extra", true);
        let b = summarize(&receipt).unwrap().canonical_sha256;
        assert_ne!(a, b);
    }

    #[test]
    fn format_summary_contains_fields() {
        let summary = summarize(&sample_receipt()).unwrap();
        let formatted = format_summary(&summary);
        assert!(formatted.contains("alice"));
        assert!(formatted.contains("k1"));
        assert!(formatted.contains("sha256:"));
    }

    #[test]
    fn detailed_view_lists_claim_values() {
        let detailed = format_detailed(&sample_receipt()).unwrap();
        assert!(detailed.contains("role = \"admin\""));
        assert!(detailed.contains("level = 3"));
    }
}
