use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::process::ExitCode;

use crate::config::{Config, CONFIG_FILE_NAMES};

pub fn run(root: &Path, force: bool) -> Result<ExitCode> {
    let file_name = CONFIG_FILE_NAMES[0];
    let config_path = root.join(file_name);

    if config_path.exists() && !force {
        println!(
            "{} Configuration file already exists: {}",
            style("!").yellow().bold(),
            config_path.display()
        );
        println!("  Use {} to overwrite.", style("--force").cyan());
        return Ok(ExitCode::SUCCESS);
    }

    let content = Config::default_toml();

    std::fs::write(&config_path, &content)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    println!(
        "{} Created configuration file: {}",
        style("✓").green().bold(),
        style(config_path.display()).cyan()
    );

    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your project layout", style(file_name).cyan());
    println!(
        "  2. Run {} to store the current hash",
        style("native-dep-hash update").cyan()
    );
    println!(
        "  3. Run {} in CI to detect native changes",
        style("native-dep-hash verify").cyan()
    );

    Ok(ExitCode::SUCCESS)
}
