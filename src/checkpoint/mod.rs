mod location;
mod reconcile;

pub use location::*;
pub use reconcile::*;

use std::path::Path;

use crate::config::CheckpointConfig;

const MANIFEST_FILE_NAME: &str = "package.json";

/// Which optional app locations a run should check in addition to the config
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationOverrides {
    pub no_sidecar: bool,
    pub runtime_version: bool,
    pub release_channel: bool,
}

/// Locations an app's checkpoint lives in
pub fn app_locations(root: &Path, config: &CheckpointConfig, overrides: LocationOverrides) -> Vec<Location> {
    let mut locations = Vec::new();

    if config.sidecar && !overrides.no_sidecar {
        locations.push(Location::Sidecar(root.join(&config.file)));
    }
    if config.runtime_version || overrides.runtime_version {
        locations.push(Location::RuntimeVersion(root.join(&config.app_config_path)));
    }
    if config.release_channel || overrides.release_channel {
        locations.push(Location::ReleaseChannel(root.join(&config.eas_path)));
    }

    locations
}

/// A library stores its hashes in its own package.json
pub fn library_locations(root: &Path, config: &CheckpointConfig, field: Option<&str>) -> Vec<Location> {
    vec![Location::ManifestField {
        path: root.join(MANIFEST_FILE_NAME),
        field: field.unwrap_or(config.manifest_field.as_str()).to_string(),
    }]
}
