//! The `truthmine sign` subcommand.
//!
//! Signs a claims document with a local key, producing a complete
//! receipt. Optionally exports the public half as a keyring document so
//! a verifier can be pointed at it directly.

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Result;
use truthmine_receipt::signer::{self, LocalSigner};
use truthmine_receipt::{ClaimMap, SignatureAlgorithm};

/// Key algorithm selection on the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum KeyAlgorithm {
    /// Ed25519 (RFC 8032).
    Ed25519,
    /// ECDSA over P-256 with SHA-256.
    EcdsaP256,
}

impl From<KeyAlgorithm> for SignatureAlgorithm {
    fn from(value: KeyAlgorithm) -> Self {
        match value {
            KeyAlgorithm::Ed25519 => Self::Ed25519,
            KeyAlgorithm::EcdsaP256 => Self::EcdsaP256,
        }
    }
}

/// Arguments for `truthmine sign`.
#[derive(Args)]
pub struct SignArgs {
    /// Path to the claims JSON file (a single JSON object).
    pub claims: PathBuf,

    /// Subject identifier the claims are about.
    #[arg(long)]
    pub subject: String,

    /// Signing key file (PKCS#8 PEM); generated if absent.
    #[arg(long, value_name = "PATH")]
    pub key: Option<PathBuf>,

    /// Key id stamped into the receipt.
    #[arg(long, default_value = "local")]
    pub key_id: String,

    /// Signature algorithm for a newly generated key.
    #[arg(long, value_enum, default_value = "ed25519")]
    pub algorithm: KeyAlgorithm,

    /// Write the receipt here instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also write a keyring document trusting this key.
    #[arg(long, value_name = "PATH")]
    pub export_keyring: Option<PathBuf>,
}

/// Execute the sign command.
pub fn execute(args: SignArgs) -> Result<()> {
    let claims: ClaimMap = serde_json::from_str(&std::fs::read_to_string(&args.claims)?)?;

    let key_path = args.key.unwrap_or_else(signer::default_key_path);
    let signer =
        LocalSigner::load_or_generate(&key_path, args.algorithm.into(), args.key_id.clone())?;

    let receipt = signer.sign_receipt(args.subject, claims)?;
    let receipt_json = receipt.to_json()?;

    match &args.output {
        Some(path) => std::fs::write(path, &receipt_json)?,
        None => println!("{receipt_json}"),
    }

    if let Some(path) = &args.export_keyring {
        let keyring = serde_json::json!({
            "keys": [{
                "key_id": signer.key_id(),
                "algorithm": signer.algorithm().as_str(),
                "public_key": signer.public_key_pem(),
            }]
        });
        std::fs::write(path, serde_json::to_string_pretty(&keyring)?)?;
    }

    Ok(())
}
