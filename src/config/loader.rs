use anyhow::{Context, Result};
use std::path::Path;

use super::Config;

pub const CONFIG_FILE_NAMES: [&str; 2] = ["native-dep-hash.toml", ".native-dep-hash.toml"];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Find and load configuration file
/// Searches the project root and its parent directories for native-dep-hash.toml
pub fn find_and_load_config(start: &Path) -> Result<Option<Config>> {
    let mut current_dir = std::fs::canonicalize(start)
        .with_context(|| format!("Project root does not exist: {}", start.display()))?;

    loop {
        for name in &CONFIG_FILE_NAMES {
            let config_path = current_dir.join(name);
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "Using config file");
                let config = load_config(&config_path)?;
                return Ok(Some(config));
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Ok(None)
}
