use anyhow::Result;
use console::style;
use std::process::ExitCode;

use crate::checkpoint::{app_locations, library_locations, CheckpointState, ReconciliationService, UpdateOutcome};
use crate::cli::{AppCheckpointArgs, FingerprintArgs, LibraryCheckpointArgs};

use super::{library_options, print_check, Context};

pub fn run_app(ctx: &Context, fingerprint: &FingerprintArgs, checkpoint: &AppCheckpointArgs) -> Result<ExitCode> {
    let service = ReconciliationService::new(app_locations(&ctx.root, &ctx.config.checkpoint, checkpoint.overrides()));
    if service.locations().is_empty() {
        anyhow::bail!("No checkpoint locations enabled; drop --no-sidecar or enable another location");
    }

    let current = ctx.fingerprint(fingerprint.options(ctx.jobs), checkpoint.require_clean)?;
    let outcome = service.update(&current)?;

    report(ctx, &outcome);
    Ok(ExitCode::SUCCESS)
}

pub fn run_library(ctx: &Context, checkpoint: &LibraryCheckpointArgs) -> Result<ExitCode> {
    let locations = library_locations(&ctx.root, &ctx.config.checkpoint, checkpoint.field.as_deref());
    let service = ReconciliationService::new(locations);

    let current = ctx.fingerprint(library_options(ctx.jobs), checkpoint.require_clean)?;
    let outcome = service.update(&current)?;

    report(ctx, &outcome);
    Ok(ExitCode::SUCCESS)
}

fn report(ctx: &Context, outcome: &UpdateOutcome) {
    if ctx.quiet {
        return;
    }

    if outcome.written.is_empty() {
        println!("{} Native dependency hash already up to date", style("✓").green().bold());
        println!("  Hash: {}", style(&outcome.reconciliation.fingerprint.all).dim());
        return;
    }

    let previous = &outcome.reconciliation;
    match previous.state() {
        CheckpointState::NoCheckpoint => {
            println!("{} Stored native dependency hash", style("✓").green().bold());
        }
        CheckpointState::Differs => {
            println!(
                "{} Native dependencies changed, updated stored hash",
                style("✓").green().bold()
            );
            for check in previous.drifted() {
                print_check(check);
            }
        }
        CheckpointState::Matches => {
            println!("{} Filled in missing checkpoint fields", style("✓").green().bold());
        }
    }

    for label in &outcome.written {
        println!("  Wrote {}", style(label).cyan());
    }
    println!("  Hash: {}", style(&previous.fingerprint.all).dim());
}
