//! Trusted key material.
//!
//! A [`Keyring`] is an immutable snapshot of the keys a verifier trusts,
//! loaded once from a JSON key-store document. Reloads replace the whole
//! snapshot; nothing mutates a keyring in place, so concurrent
//! verification needs no locking.

use std::path::Path;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReceiptError;

/// Signature algorithms the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// Ed25519 (RFC 8032).
    #[serde(rename = "ed25519")]
    Ed25519,
    /// ECDSA over P-256 with SHA-256, ASN.1 signature encoding.
    #[serde(rename = "ecdsa-p256")]
    EcdsaP256,
}

impl SignatureAlgorithm {
    /// Stable string name, matching the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::EcdsaP256 => "ecdsa-p256",
        }
    }
}

/// A single trusted public key.
#[derive(Debug, Clone)]
pub struct TrustedKey {
    /// Unique identifier referenced by receipts' `signer_key_id`.
    pub key_id: String,
    /// Algorithm this key verifies.
    pub algorithm: SignatureAlgorithm,
    /// Raw public key material (uncompressed EC point or Ed25519 point).
    pub public_key_material: Vec<u8>,
    /// Start of the validity window, if bounded.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window, if bounded.
    pub valid_until: Option<DateTime<Utc>>,
}

impl TrustedKey {
    /// `true` if `now` falls inside this key's validity window.
    #[must_use]
    pub fn valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.valid_from.is_some_and(|from| now < from) {
            return false;
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return false;
        }
        true
    }
}

/// Immutable snapshot of trusted keys.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: Vec<TrustedKey>,
}

/// On-disk form of a trusted key: PEM-encoded SPKI plus metadata.
#[derive(Debug, Serialize, Deserialize)]
struct TrustedKeyDoc {
    key_id: String,
    algorithm: SignatureAlgorithm,
    public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    valid_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    valid_until: Option<DateTime<Utc>>,
}

/// On-disk key-store document.
#[derive(Debug, Serialize, Deserialize)]
struct KeyringDoc {
    keys: Vec<TrustedKeyDoc>,
}

impl Keyring {
    /// Build a keyring from already-parsed keys.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Key`] if two keys share a `key_id`.
    pub fn from_keys(keys: Vec<TrustedKey>) -> Result<Self, ReceiptError> {
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].iter().any(|k| k.key_id == key.key_id) {
                return Err(ReceiptError::Key(format!(
                    "duplicate key_id `{}` in keyring",
                    key.key_id
                )));
            }
        }
        Ok(Self { keys })
    }

    /// Parse a keyring from its JSON key-store document.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError`] on malformed JSON, un-parseable PEM,
    /// material of the wrong length, or duplicate key ids.
    pub fn from_json(json: &str) -> Result<Self, ReceiptError> {
        let doc: KeyringDoc = serde_json::from_str(json)?;
        let keys = doc
            .keys
            .into_iter()
            .map(|entry| {
                let spki = pem_to_der(&entry.public_key).ok_or_else(|| {
                    ReceiptError::Key(format!("key `{}`: invalid PEM", entry.key_id))
                })?;
                let material = raw_point_from_spki(entry.algorithm, &spki).ok_or_else(|| {
                    ReceiptError::Key(format!(
                        "key `{}`: not a valid {} SPKI",
                        entry.key_id,
                        entry.algorithm.as_str()
                    ))
                })?;
                Ok(TrustedKey {
                    key_id: entry.key_id,
                    algorithm: entry.algorithm,
                    public_key_material: material,
                    valid_from: entry.valid_from,
                    valid_until: entry.valid_until,
                })
            })
            .collect::<Result<Vec<_>, ReceiptError>>()?;
        Self::from_keys(keys)
    }

    /// Load a keyring from a JSON file.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Keyring::from_json`], plus I/O.
    pub fn from_file(path: &Path) -> Result<Self, ReceiptError> {
        let data = std::fs::read_to_string(path)?;
        let ring = Self::from_json(&data)?;
        tracing::info!(
            path = %path.display(),
            keys = ring.len(),
            "loaded trusted keyring"
        );
        Ok(ring)
    }

    /// Look up a key by id.
    #[must_use]
    pub fn get(&self, key_id: &str) -> Option<&TrustedKey> {
        self.keys.iter().find(|k| k.key_id == key_id)
    }

    /// Number of keys in the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if the ring holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ── SPKI / PEM helpers ───────────────────────────────────────────────

/// Fixed SPKI ASN.1 header for P-256 uncompressed public keys (26 bytes).
#[rustfmt::skip]
const P256_SPKI_HEADER: [u8; 26] = [
    0x30, 0x59,                                     // SEQUENCE (89 bytes total)
    0x30, 0x13,                                     // SEQUENCE (19 bytes)
    0x06, 0x07,                                     // OID (7 bytes)
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01,       // 1.2.840.10045.2.1
    0x06, 0x08,                                     // OID (8 bytes)
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, // 1.2.840.10045.3.1.7
    0x03, 0x42, 0x00,                               // BIT STRING (66 bytes, 0 unused bits)
];

/// Fixed SPKI ASN.1 header for Ed25519 public keys (12 bytes).
#[rustfmt::skip]
const ED25519_SPKI_HEADER: [u8; 12] = [
    0x30, 0x2a,                   // SEQUENCE (42 bytes total)
    0x30, 0x05,                   // SEQUENCE (5 bytes)
    0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (id-Ed25519)
    0x03, 0x21, 0x00,             // BIT STRING (33 bytes, 0 unused bits)
];

const fn spki_header(algorithm: SignatureAlgorithm) -> &'static [u8] {
    match algorithm {
        SignatureAlgorithm::Ed25519 => &ED25519_SPKI_HEADER,
        SignatureAlgorithm::EcdsaP256 => &P256_SPKI_HEADER,
    }
}

const fn raw_point_len(algorithm: SignatureAlgorithm) -> usize {
    match algorithm {
        SignatureAlgorithm::Ed25519 => 32,
        SignatureAlgorithm::EcdsaP256 => 65,
    }
}

/// Wrap a raw public key in the algorithm's fixed SPKI DER header.
#[must_use]
pub fn encode_spki(algorithm: SignatureAlgorithm, raw_point: &[u8]) -> Vec<u8> {
    let header = spki_header(algorithm);
    let mut spki = Vec::with_capacity(header.len() + raw_point.len());
    spki.extend_from_slice(header);
    spki.extend_from_slice(raw_point);
    spki
}

/// Extract the raw public key from SPKI DER, checking the fixed header.
#[must_use]
pub fn raw_point_from_spki(algorithm: SignatureAlgorithm, spki: &[u8]) -> Option<Vec<u8>> {
    let header = spki_header(algorithm);
    let raw = spki.strip_prefix(header)?;
    (raw.len() == raw_point_len(algorithm)).then(|| raw.to_vec())
}

/// Wrap DER bytes in PEM with the given label.
#[must_use]
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    use std::fmt::Write;

    let b64 = base64::engine::general_purpose::STANDARD.encode(der);
    let mut pem = format!("-----BEGIN {label}-----\n");
    for chunk in b64.as_bytes().chunks(64) {
        pem.push_str(std::str::from_utf8(chunk).expect("base64 is ASCII"));
        pem.push('\n');
    }
    let _ = writeln!(pem, "-----END {label}-----");
    pem
}

/// Extract DER bytes from a PEM string.
#[must_use]
pub fn pem_to_der(pem: &str) -> Option<Vec<u8>> {
    let mut b64 = String::new();
    let mut in_body = false;

    for line in pem.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("-----BEGIN ") {
            in_body = true;
            continue;
        }
        if trimmed.starts_with("-----END ") {
            break;
        }
        if in_body {
            b64.push_str(trimmed);
        }
    }

    base64::engine::general_purpose::STANDARD.decode(&b64).ok()
}
