//! Apply a deployment manifest

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use dialoguer::Confirm;

use stratus_provider::MemoryProvider;
use stratus_provisioning::{ApplyReport, Outcome, ProvisioningScheduler, SchedulerConfig};

use crate::error::{CliError, CliResult};
use crate::manifest::Manifest;

/// Apply a deployment manifest
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to deployment manifest
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Show the plan without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Maximum concurrent remote calls
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override the manifest region
    #[arg(long)]
    pub region: Option<String>,
}

/// Execute the apply command
pub async fn execute(args: ApplyArgs) -> CliResult<()> {
    let manifest = Manifest::load(&args.file)?;
    let declarations = manifest.declarations()?;

    let region = args.region.clone().unwrap_or_else(|| manifest.region.clone());
    let config = SchedulerConfig {
        concurrency: args
            .concurrency
            .or(manifest.concurrency)
            .unwrap_or_else(|| SchedulerConfig::default().concurrency),
        region: region.clone(),
    };

    let provider = Arc::new(MemoryProvider::with_region(region));
    let scheduler = ProvisioningScheduler::with_config(provider, config);

    // Plan first: a bad manifest must fail before anything runs.
    let plan = scheduler.plan(&declarations)?;

    if !args.json {
        println!(
            "Applying {} declaration(s) in {} wave(s)",
            plan.len(),
            plan.waves.len()
        );
    }

    if args.dry_run {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!("Dry run; nothing applied.");
        }
        return Ok(());
    }

    // Confirm before applying (unless --yes is passed)
    if !args.yes {
        if !atty::is(atty::Stream::Stdin) {
            return Err(CliError::Validation(
                "Cannot confirm in non-interactive mode. Use --yes to skip confirmation."
                    .to_string(),
            ));
        }

        let confirm = Confirm::new()
            .with_prompt(format!("Apply {} declaration(s)?", plan.len()))
            .default(false)
            .interact()
            .map_err(|e| CliError::Io(e.to_string()))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let report = scheduler.apply(&declarations).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            failed: report.failed_count(),
            skipped: report.skipped_count(),
            cancelled: report.cancelled_count(),
        })
    }
}

fn print_report(report: &ApplyReport) {
    for (name, outcome) in &report.outcomes {
        match outcome {
            Outcome::Created { id, .. } => println!("  created  {name} ({id})"),
            Outcome::Failed { error } => println!("  failed   {name}: {error}"),
            Outcome::Skipped { cause } => println!("  skipped  {name} (upstream: {cause})"),
            Outcome::Cancelled => println!("  cancelled {name}"),
        }
    }
    println!(
        "\n{} created, {} failed, {} skipped, {} cancelled",
        report.created_count(),
        report.failed_count(),
        report.skipped_count(),
        report.cancelled_count()
    );
}
