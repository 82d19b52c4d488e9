//! Issuer-side receipt signing.
//!
//! Uses `aws-lc-rs` as the cryptographic provider. Keys are stored as
//! PKCS#8 DER wrapped in PEM, created with mode `0o600` (owner-only
//! read/write).

use std::path::Path;

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, Ed25519KeyPair, KeyPair,
};

use crate::canonical;
use crate::error::ReceiptError;
use crate::keyring::{self, SignatureAlgorithm, TrustedKey};
use crate::receipt::Receipt;
use crate::value::ClaimMap;

enum KeyPairKind {
    Ed25519(Ed25519KeyPair),
    EcdsaP256(EcdsaKeyPair),
}

/// Local signer backed by an on-disk PKCS#8 key.
pub struct LocalSigner {
    key: KeyPairKind,
    rng: SystemRandom,
    key_id: String,
}

impl LocalSigner {
    /// Load an existing key from `key_path`, or generate a new one if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Key`] if the key file exists but cannot be
    /// parsed as PKCS#8 for `algorithm`, or cannot be created or written.
    pub fn load_or_generate(
        key_path: &Path,
        algorithm: SignatureAlgorithm,
        key_id: impl Into<String>,
    ) -> Result<Self, ReceiptError> {
        let rng = SystemRandom::new();
        let key_id = key_id.into();

        let pkcs8 = if key_path.exists() {
            let pem = std::fs::read_to_string(key_path)
                .map_err(|e| ReceiptError::Key(format!("failed to read key file: {e}")))?;
            let der = keyring::pem_to_der(&pem)
                .ok_or_else(|| ReceiptError::Key("invalid PEM format".to_owned()))?;
            tracing::info!(path = %key_path.display(), "loaded existing signing key");
            der
        } else {
            let der = generate_pkcs8(algorithm, &rng)?;

            if let Some(parent) = key_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ReceiptError::Key(format!(
                        "failed to create key directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }

            let pem = keyring::der_to_pem(&der, "PRIVATE KEY");
            std::fs::write(key_path, pem.as_bytes())
                .map_err(|e| ReceiptError::Key(format!("failed to write key file: {e}")))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o600);
                std::fs::set_permissions(key_path, perms).map_err(|e| {
                    ReceiptError::Key(format!("failed to set key file permissions: {e}"))
                })?;
            }

            tracing::info!(
                path = %key_path.display(),
                algorithm = algorithm.as_str(),
                "generated new signing key"
            );
            der
        };

        let key = parse_pkcs8(algorithm, &pkcs8)?;
        Ok(Self { key, rng, key_id })
    }

    /// The algorithm of the loaded key.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        match self.key {
            KeyPairKind::Ed25519(_) => SignatureAlgorithm::Ed25519,
            KeyPairKind::EcdsaP256(_) => SignatureAlgorithm::EcdsaP256,
        }
    }

    /// The key id stamped into signed receipts.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The public key as PEM-encoded SPKI.
    #[must_use]
    pub fn public_key_pem(&self) -> String {
        let raw = match &self.key {
            KeyPairKind::Ed25519(kp) => kp.public_key().as_ref(),
            KeyPairKind::EcdsaP256(kp) => kp.public_key().as_ref(),
        };
        let spki = keyring::encode_spki(self.algorithm(), raw);
        keyring::der_to_pem(&spki, "PUBLIC KEY")
    }

    /// This signer's public half as a [`TrustedKey`] with an unbounded
    /// validity window.
    #[must_use]
    pub fn trusted_key(&self) -> TrustedKey {
        let raw = match &self.key {
            KeyPairKind::Ed25519(kp) => kp.public_key().as_ref(),
            KeyPairKind::EcdsaP256(kp) => kp.public_key().as_ref(),
        };
        TrustedKey {
            key_id: self.key_id.clone(),
            algorithm: self.algorithm(),
            public_key_material: raw.to_vec(),
            valid_from: None,
            valid_until: None,
        }
    }

    /// Sign `claims` about `subject`, producing a complete receipt.
    ///
    /// The signature covers the canonical encoding, so receipts stay
    /// verifiable however a consumer re-serializes the claim map.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Encoding`] for claim trees with no
    /// canonical form, or [`ReceiptError::SigningFailed`] on a crypto
    /// failure.
    pub fn sign_receipt(
        &self,
        subject: impl Into<String>,
        claims: ClaimMap,
    ) -> Result<Receipt, ReceiptError> {
        let subject = subject.into();
        let payload = canonical::encode_receipt(&subject, &claims)?;

        let signature = match &self.key {
            KeyPairKind::Ed25519(kp) => kp.sign(&payload).as_ref().to_vec(),
            KeyPairKind::EcdsaP256(kp) => kp
                .sign(&self.rng, &payload)
                .map_err(|e| ReceiptError::SigningFailed(format!("ECDSA sign failed: {e}")))?
                .as_ref()
                .to_vec(),
        };

        Ok(Receipt {
            subject,
            claims,
            signer_key_id: self.key_id.clone(),
            signature,
        })
    }
}

fn generate_pkcs8(
    algorithm: SignatureAlgorithm,
    rng: &SystemRandom,
) -> Result<Vec<u8>, ReceiptError> {
    match algorithm {
        SignatureAlgorithm::Ed25519 => Ed25519KeyPair::generate_pkcs8(rng)
            .map(|doc| doc.as_ref().to_vec())
            .map_err(|e| ReceiptError::Key(format!("failed to generate key: {e}"))),
        SignatureAlgorithm::EcdsaP256 => {
            EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, rng)
                .map(|doc| doc.as_ref().to_vec())
                .map_err(|e| ReceiptError::Key(format!("failed to generate key: {e}")))
        }
    }
}

fn parse_pkcs8(algorithm: SignatureAlgorithm, der: &[u8]) -> Result<KeyPairKind, ReceiptError> {
    match algorithm {
        SignatureAlgorithm::Ed25519 => Ed25519KeyPair::from_pkcs8(der)
            .map(KeyPairKind::Ed25519)
            .map_err(|e| ReceiptError::Key(format!("failed to parse PKCS#8 key: {e}"))),
        SignatureAlgorithm::EcdsaP256 => {
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, der)
                .map(KeyPairKind::EcdsaP256)
                .map_err(|e| ReceiptError::Key(format!("failed to parse PKCS#8 key: {e}")))
        }
    }
}

/// Default signing key path: `~/.config/truthmine/keys/local.pem`.
#[must_use]
pub fn default_key_path() -> std::path::PathBuf {
    directories::ProjectDirs::from("dev", "truthmine", "truthmine").map_or_else(
        || {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
            std::path::PathBuf::from(home).join(".config/truthmine/keys/local.pem")
        },
        |dirs| dirs.config_dir().join("keys/local.pem"),
    )
}
