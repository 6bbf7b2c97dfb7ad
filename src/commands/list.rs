use anyhow::{Context as _, Result};
use console::style;
use std::process::ExitCode;

use crate::fingerprint::{thread_pool, Module, ModuleScanner, Platform};

use super::Context;

pub fn run(ctx: &Context, platform: Platform, json: bool) -> Result<ExitCode> {
    let project = &ctx.config.project;
    let scanner = ModuleScanner::new(&ctx.root, &project.packages_dirs, &ctx.config.checkpoint.manifest_field);
    let modules = thread_pool(ctx.jobs)?
        .install(|| scanner.scan())
        .context("Failed to scan installed packages")?;

    let native: Vec<&Module> = modules.iter().filter(|m| m.is_native(platform)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&native)?);
        return Ok(ExitCode::SUCCESS);
    }

    if native.is_empty() {
        println!("{} No native modules found", style("!").yellow().bold());
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} native module(s) ({})",
        style("📦").blue().bold(),
        native.len(),
        platform
    );
    for module in native {
        let mut platforms = Vec::new();
        if module.is_native_ios {
            platforms.push("ios");
        }
        if module.is_native_android {
            platforms.push("android");
        }

        print!("  {} {}", style(&module.name).cyan(), module.version);
        if let Some(marker) = module.native_hash.as_ref().and_then(|h| h.for_platform(platform)) {
            print!(" {}", style(format!("(hash {})", marker)).dim());
        }
        println!(" [{}]", platforms.join(", "));
    }

    Ok(ExitCode::SUCCESS)
}
