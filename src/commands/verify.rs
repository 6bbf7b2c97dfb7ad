use anyhow::Result;
use console::style;
use std::process::ExitCode;

use crate::checkpoint::{app_locations, library_locations, CheckpointState, Reconciliation, ReconciliationService};
use crate::cli::{AppCheckpointArgs, FingerprintArgs, LibraryCheckpointArgs};

use super::{library_options, print_check, Context};

pub fn run_app(ctx: &Context, fingerprint: &FingerprintArgs, checkpoint: &AppCheckpointArgs) -> Result<ExitCode> {
    let locations = app_locations(&ctx.root, &ctx.config.checkpoint, checkpoint.overrides());
    let service = ReconciliationService::new(locations);

    let current = ctx.fingerprint(fingerprint.options(ctx.jobs), checkpoint.require_clean)?;
    let reconciliation = service.verify(&current)?;

    Ok(report(ctx, &reconciliation, "native-dep-hash update"))
}

pub fn run_library(ctx: &Context, checkpoint: &LibraryCheckpointArgs) -> Result<ExitCode> {
    let locations = library_locations(&ctx.root, &ctx.config.checkpoint, checkpoint.field.as_deref());
    let service = ReconciliationService::new(locations);

    let current = ctx.fingerprint(library_options(ctx.jobs), checkpoint.require_clean)?;
    let reconciliation = service.verify(&current)?;

    Ok(report(ctx, &reconciliation, "native-dep-hash update-library"))
}

fn report(ctx: &Context, reconciliation: &Reconciliation, update_command: &str) -> ExitCode {
    match reconciliation.state() {
        CheckpointState::NoCheckpoint => {
            println!("{} No native dependency hash found", style("✗").red().bold());
            println!("  Run {} to create one.", style(update_command).cyan());
            ExitCode::FAILURE
        }
        CheckpointState::Differs => {
            println!(
                "{} Native dependencies changed, a new native build is required",
                style("✗").red().bold()
            );
            for check in reconciliation.drifted() {
                print_check(check);
            }
            println!("  Run {} after building to store the new hash.", style(update_command).cyan());
            ExitCode::FAILURE
        }
        CheckpointState::Matches => {
            if !ctx.quiet {
                println!("{} Native dependencies unchanged", style("✓").green().bold());
                println!("  Hash: {}", style(&reconciliation.fingerprint.all).dim());

                let missing = reconciliation.missing().count();
                if missing > 0 {
                    println!(
                        "  {} {} checkpoint field(s) missing, run {} to fill them in",
                        style("!").yellow().bold(),
                        missing,
                        style(update_command).cyan()
                    );
                }
            }
            ExitCode::SUCCESS
        }
    }
}
