//! stratus CLI - declarative provisioning for serverless pipelines
//!
//! This CLI enables developers to:
//! - Validate a deployment manifest and inspect its execution plan
//! - Apply a manifest, driving every declaration to a terminal state
//! - See per-declaration outcomes suitable for scripting (`--json`)

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod manifest;

use error::CliResult;

/// stratus CLI - provisioning orchestrator
#[derive(Parser)]
#[command(name = "stratus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dependency graph and show the execution plan
    Plan(commands::plan::PlanArgs),

    /// Apply a deployment manifest
    Apply(commands::apply::ApplyArgs),
}

#[tokio::main]
async fn main() {
    // Initialize logging; the report itself goes to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Apply(args) => commands::apply::execute(args).await,
    }
}
