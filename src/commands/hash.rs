use anyhow::Result;
use std::process::ExitCode;

use crate::cli::FingerprintArgs;
use crate::fingerprint::Platform;

use super::Context;

/// Print the hash on stdout alone so it can be captured by scripts
pub fn run(ctx: &Context, platform: Platform, json: bool, fingerprint: &FingerprintArgs) -> Result<ExitCode> {
    let current = ctx.fingerprint(fingerprint.options(ctx.jobs), false)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&current)?);
    } else {
        println!("{}", current.get(platform));
    }

    Ok(ExitCode::SUCCESS)
}
