//! The `truthmine inspect` subcommand.
//!
//! Displays a receipt in human-readable format.

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::Result;
use truthmine_receipt::Receipt;
use truthmine_verify::inspect;

/// Arguments for `truthmine inspect`.
#[derive(Args)]
pub struct InspectArgs {
    /// Path to the receipt JSON file.
    pub receipt: PathBuf,

    /// Show the full claim tree, not just the summary.
    #[arg(long)]
    pub detailed: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the inspect command.
pub fn execute(args: &InspectArgs) -> Result<()> {
    let receipt = Receipt::from_json(&std::fs::read_to_string(&args.receipt)?)?;

    if args.json {
        let summary = inspect::summarize(&receipt)?;
        let output = serde_json::json!({
            "subject": summary.subject,
            "signer_key_id": summary.signer_key_id,
            "claim_count": summary.claim_count,
            "canonical_sha256": summary.canonical_sha256,
            "claims": receipt.claims,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if args.detailed {
        print!("{}", inspect::format_detailed(&receipt)?);
    } else {
        let summary = inspect::summarize(&receipt)?;
        print!("{}", inspect::format_summary(&summary));
    }

    Ok(())
}
