//! Truthmine CLI — signed-receipt verification against declarative policy.
//!
//! Sign receipts, inspect them, and verify them against a trusted
//! keyring and an ordered rule set.

mod commands;
mod report;

use clap::Parser;
use color_eyre::eyre::Result;

/// Truthmine — receipt and policy verification.
///
/// A receipt is a signed record asserting claims about a subject.
/// Truthmine verifies the signature against a trusted keyring and
/// evaluates an ordered, deny-overrides rule set over the claims.
#[derive(Parser)]
#[command(name = "truthmine", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (repeat for more detail: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output logs as JSON (for machine consumption).
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Verify a receipt's signature and policy compliance.
    Verify(commands::verify::VerifyArgs),
    /// Display a receipt in human-readable format.
    Inspect(commands::inspect::InspectArgs),
    /// Sign a claims document, producing a receipt.
    Sign(commands::sign::SignArgs),
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Verify(args) => commands::verify::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(&args),
        Commands::Sign(args) => commands::sign::execute(args),
    }
}
