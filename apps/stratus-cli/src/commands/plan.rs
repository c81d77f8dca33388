//! Show the execution plan for a manifest

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use stratus_core::LogicalName;
use stratus_provider::{MemoryProvider, ResourceKind};
use stratus_provisioning::{Declaration, Plan, ProvisioningScheduler, SchedulerConfig};

use crate::error::CliResult;
use crate::manifest::Manifest;

/// Build the dependency graph and show the execution plan
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to deployment manifest
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the plan command
pub fn execute(args: PlanArgs) -> CliResult<()> {
    let manifest = Manifest::load(&args.file)?;
    let declarations = manifest.declarations()?;

    // Planning never touches the backend; validation and cycle detection
    // both happen before anything could.
    let provider = Arc::new(MemoryProvider::with_region(manifest.region.clone()));
    let scheduler = ProvisioningScheduler::with_config(
        provider,
        SchedulerConfig {
            region: manifest.region.clone(),
            ..SchedulerConfig::default()
        },
    );
    let plan = scheduler.plan(&declarations)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    print_plan(&plan, &declarations);
    Ok(())
}

fn print_plan(plan: &Plan, declarations: &[Declaration]) {
    let kinds: BTreeMap<&LogicalName, ResourceKind> = declarations
        .iter()
        .map(|declaration| (declaration.name(), declaration.kind()))
        .collect();

    println!(
        "Plan: {} declaration(s) in {} wave(s)",
        plan.len(),
        plan.waves.len()
    );
    for (index, wave) in plan.waves.iter().enumerate() {
        println!("\nWave {}:", index + 1);
        for name in wave {
            match kinds.get(name) {
                Some(kind) => println!("  {name} ({kind})"),
                None => println!("  {name}"),
            }
        }
    }
}
