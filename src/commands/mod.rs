pub mod hash;
pub mod init;
pub mod list;
pub mod update;
pub mod verify;

use anyhow::{bail, Context as _, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::checkpoint::FieldCheck;
use crate::cli::Cli;
use crate::config::{find_and_load_config, load_config, Config};
use crate::fingerprint::{AppConfigSource, Fingerprint, FingerprintEngine, FingerprintOptions};
use crate::vcs::{tracked_files, TrackedFiles};

/// Resolved project root and configuration shared by every command
pub struct Context {
    pub root: PathBuf,
    pub config: Config,
    pub jobs: Option<usize>,
    pub quiet: bool,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        if !cli.root.is_dir() {
            bail!("Project root is not a directory: {}", cli.root.display());
        }

        let config = match &cli.config {
            Some(path) => load_config(path)?,
            None => find_and_load_config(&cli.root)?.unwrap_or_default(),
        };

        Ok(Self {
            root: cli.root.clone(),
            config,
            jobs: cli.jobs,
            quiet: cli.quiet,
        })
    }

    /// Compute the project fingerprint, refusing a dirty tree when asked to
    pub fn fingerprint(&self, options: FingerprintOptions, require_clean: bool) -> Result<Fingerprint> {
        let files = tracked_files(
            &self.root,
            &self.config.project.packages_dirs,
            &self.config.inputs.exclude_globs,
        )?;
        ensure_clean(files.as_ref(), require_clean)?;

        let tracked = files.list()?;
        tracing::debug!(source = files.describe(), count = tracked.len(), "Listed tracked files");

        let app_config = if options.skip_app_config {
            None
        } else {
            self.load_app_config()
        };

        let fingerprint = FingerprintEngine::new(&self.root, &self.config, options)
            .compute(&tracked, app_config.as_ref())
            .with_context(|| format!("Failed to fingerprint {}", self.root.display()))?;

        tracing::debug!(ios = %fingerprint.ios, android = %fingerprint.android, all = %fingerprint.all, "Computed fingerprint");
        Ok(fingerprint)
    }

    fn load_app_config(&self) -> Option<Value> {
        let project = &self.config.project;
        let source = AppConfigSource {
            command: project.app_config_command.clone(),
            file: project.app_config_file.clone(),
        };

        // Evaluating the config through npx can take a few seconds
        let spinner = if self.quiet || source.command.is_empty() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(spinner_style);
        }
        spinner.set_message("Evaluating app config...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let config = source.load(&self.root);
        spinner.finish_and_clear();
        config
    }
}

/// A library is hashed from its own native folders and plugins only
fn library_options(jobs: Option<usize>) -> FingerprintOptions {
    FingerprintOptions {
        skip_node_modules: true,
        skip_app_config: true,
        jobs,
        ..Default::default()
    }
}

fn ensure_clean(files: &dyn TrackedFiles, require_clean: bool) -> Result<()> {
    if !require_clean {
        return Ok(());
    }

    if !files.is_versioned() {
        tracing::warn!("Not a git repository, cannot check for uncommitted changes");
        return Ok(());
    }

    if files.is_dirty()? {
        bail!("Working tree has uncommitted changes; commit or stash them before hashing");
    }
    Ok(())
}

fn print_check(check: &FieldCheck) {
    println!(
        "  {} {} [{}]: {} {} {}",
        style(&check.location).dim(),
        check.field,
        check.platform,
        style(check.found.as_deref().unwrap_or("<missing>")).red(),
        style("→").dim(),
        style(&check.expected).green()
    );
}
