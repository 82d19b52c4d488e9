//! The `truthmine verify` subcommand.
//!
//! Verifies a receipt's signature against a trusted keyring and
//! evaluates the policy, printing a markdown or JSON report.

use std::path::PathBuf;
use std::process;

use clap::Args;
use color_eyre::eyre::Result;
use truthmine_receipt::{Keyring, Receipt};
use truthmine_verify::policy::{Effect, Policy, Predicate, Rule};
use truthmine_verify::Verifier;

use crate::report;

/// Report output format.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Format {
    /// Markdown report for humans.
    Markdown,
    /// Pretty-printed JSON for machines.
    Json,
}

/// Arguments for `truthmine verify`.
#[derive(Args)]
pub struct VerifyArgs {
    /// Path to the receipt JSON file.
    pub receipt: PathBuf,

    /// Path to the trusted keyring JSON file.
    #[arg(long, value_name = "PATH")]
    pub keys: PathBuf,

    /// Policy file (JSON) to evaluate. Without one, any well-signed
    /// receipt is accepted.
    #[arg(long, value_name = "PATH")]
    pub policy: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value = "markdown")]
    pub format: Format,
}

/// Execute the verify command.
pub fn execute(args: VerifyArgs) -> Result<()> {
    let receipt = Receipt::from_json(&std::fs::read_to_string(&args.receipt)?)?;
    let keyring = Keyring::from_file(&args.keys)?;

    let policy = match &args.policy {
        Some(path) => Policy::from_file(path)?,
        None => accept_signed_policy(),
    };

    let verifier = Verifier::new(keyring, policy)?;
    let verdict = verifier.verify_receipt(&receipt)?;

    match args.format {
        Format::Json => println!("{}", report::render_json(&verdict)?),
        Format::Markdown => print!("{}", report::render_markdown(&verdict)),
    }

    if !verdict.passed() {
        process::exit(1);
    }

    Ok(())
}

/// Fallback policy when no `--policy` is given: accept any receipt that
/// survived the signature gate.
fn accept_signed_policy() -> Policy {
    Policy {
        rules: vec![Rule {
            id: "accept-signed".to_owned(),
            effect: Effect::Allow,
            predicate: Predicate::Exists {
                path: "subject".to_owned(),
            },
            reason: "no policy given; signature verification passed".to_owned(),
        }],
    }
}
