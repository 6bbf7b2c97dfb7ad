mod checkpoint;
mod cli;
mod commands;
mod config;
mod error;
mod fingerprint;
mod utils;
mod vcs;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use commands::Context;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    // Logs go to stderr so `hash` output stays pipeable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("native_dep_hash={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    match &cli.command {
        Commands::Init { force } => commands::init::run(&cli.root, *force),
        Commands::Verify { fingerprint, checkpoint } => {
            commands::verify::run_app(&Context::load(&cli)?, fingerprint, checkpoint)
        }
        Commands::VerifyLibrary { checkpoint } => commands::verify::run_library(&Context::load(&cli)?, checkpoint),
        Commands::Update { fingerprint, checkpoint } => {
            commands::update::run_app(&Context::load(&cli)?, fingerprint, checkpoint)
        }
        Commands::UpdateLibrary { checkpoint } => commands::update::run_library(&Context::load(&cli)?, checkpoint),
        Commands::List { platform, json } => commands::list::run(&Context::load(&cli)?, *platform, *json),
        Commands::Hash {
            platform,
            json,
            fingerprint,
        } => commands::hash::run(&Context::load(&cli)?, *platform, *json, fingerprint),
    }
}
