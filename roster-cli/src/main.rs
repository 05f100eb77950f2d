//! Roster: membership roster and mailing-list synchronization CLI.
//!
//! # Usage
//!
//! ```text
//! roster sync [--mode full|expired-only] [--dry-run] [--env ENV] [--config FILE] [--json]
//! roster plan --roster FILE --group FILE [--mode ...] [--now SECONDS] [--json]
//! roster enroll --body FILE [--method POST] [--env ENV] [--config FILE]
//! roster canonicalize <EMAIL>...
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    canonicalize::CanonicalizeArgs, enroll::EnrollArgs, plan::PlanArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Keep the mailing-list group in step with the membership roster",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the group against the roster and apply the changes.
    Sync(SyncArgs),

    /// Show what a sync would do, from local roster and group snapshots.
    Plan(PlanArgs),

    /// Process one membership form submission.
    Enroll(EnrollArgs),

    /// Print the comparison key for each address.
    Canonicalize(CanonicalizeArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Enroll(args) => args.run(),
        Commands::Canonicalize(args) => args.run(),
    }
}
