use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

use crate::fingerprint::{Fingerprint, Platform};
use crate::utils::fs::{read_json_document, write_atomic, write_json_document};

/// A place a previously computed fingerprint is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// One-line file holding the combined hash
    Sidecar(PathBuf),
    /// Object field `{ ios, android, all }` in package.json
    ManifestField { path: PathBuf, field: String },
    /// `runtimeVersion` fields of the app config document
    RuntimeVersion(PathBuf),
    /// `releaseChannel` of every build profile
    ReleaseChannel(PathBuf),
}

/// One stored value compared against the fresh fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub location: String,
    pub field: String,
    pub platform: Platform,
    pub expected: String,
    pub found: Option<String>,
}

impl FieldCheck {
    pub fn is_present(&self) -> bool {
        self.found.is_some()
    }

    pub fn differs(&self) -> bool {
        self.found.as_deref().is_some_and(|found| found != self.expected)
    }
}

impl Location {
    pub fn path(&self) -> &Path {
        match self {
            Location::Sidecar(path)
            | Location::ManifestField { path, .. }
            | Location::RuntimeVersion(path)
            | Location::ReleaseChannel(path) => path,
        }
    }

    pub fn label(&self) -> String {
        let file = self
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().display().to_string());

        match self {
            Location::Sidecar(_) => file,
            Location::ManifestField { field, .. } => format!("{} ({})", file, field),
            Location::RuntimeVersion(_) => format!("{} (runtimeVersion)", file),
            Location::ReleaseChannel(_) => format!("{} (releaseChannel)", file),
        }
    }

    /// Read every stored value this location holds
    pub fn read(&self, fingerprint: &Fingerprint) -> Result<Vec<FieldCheck>> {
        let label = self.label();
        let check = |field: &str, platform: Platform, found: Option<&Value>| FieldCheck {
            location: label.clone(),
            field: field.to_string(),
            platform,
            expected: fingerprint.get(platform).to_string(),
            found: found.and_then(stored_value),
        };

        let checks = match self {
            Location::Sidecar(path) => {
                let found = match std::fs::read_to_string(path) {
                    Ok(content) => Some(Value::String(content)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        return Err(e).with_context(|| format!("Failed to read checkpoint file: {}", path.display()));
                    }
                };
                vec![check("hash", Platform::All, found.as_ref())]
            }
            Location::ManifestField { path, field } => {
                let document = read_json_document(path)?;
                match document.get(field) {
                    Some(stored) if stored.is_string() => vec![check(field.as_str(), Platform::All, Some(stored))],
                    stored => Platform::EVERY
                        .iter()
                        .map(|&platform| {
                            let value = stored.and_then(|s| s.get(platform.as_str()));
                            check(&format!("{}.{}", field, platform), platform, value)
                        })
                        .collect(),
                }
            }
            Location::RuntimeVersion(path) => {
                let document = read_json_document(path)?;
                let config = app_config_root(&document);
                vec![
                    check("runtimeVersion", Platform::All, config.get("runtimeVersion")),
                    check(
                        "ios.runtimeVersion",
                        Platform::Ios,
                        config.get("ios").and_then(|ios| ios.get("runtimeVersion")),
                    ),
                    check(
                        "android.runtimeVersion",
                        Platform::Android,
                        config.get("android").and_then(|android| android.get("runtimeVersion")),
                    ),
                ]
            }
            Location::ReleaseChannel(path) => {
                let document = read_json_document(path)?;
                build_profiles(&document)
                    .map(|(name, profile)| {
                        check(&format!("build.{}.releaseChannel", name), Platform::All, profile.get("releaseChannel"))
                    })
                    .collect()
            }
        };

        Ok(checks)
    }

    /// Store the fingerprint, leaving every other field of the document intact
    pub fn write(&self, fingerprint: &Fingerprint) -> Result<()> {
        match self {
            Location::Sidecar(path) => write_atomic(path, format!("{}\n", fingerprint.all).as_bytes()),
            Location::ManifestField { path, field } => {
                let mut document = read_json_document(path)?;
                let root = as_object(&mut document, path)?;
                let entry = root.entry(field.clone()).or_insert_with(|| json!({}));
                if !entry.is_object() {
                    *entry = json!({});
                }
                for platform in Platform::EVERY {
                    entry[platform.as_str()] = json!(fingerprint.get(platform));
                }
                write_json_document(path, &document)
            }
            Location::RuntimeVersion(path) => {
                let mut document = read_json_document(path)?;
                let root = as_object(&mut document, path)?;
                let config = if root.get("expo").is_some_and(Value::is_object) {
                    root.get_mut("expo")
                        .and_then(Value::as_object_mut)
                        .context("`expo` is not an object")?
                } else {
                    root
                };
                config.insert("runtimeVersion".to_string(), json!(fingerprint.all));
                for platform in [Platform::Ios, Platform::Android] {
                    let section = config.entry(platform.as_str()).or_insert_with(|| json!({}));
                    if !section.is_object() {
                        anyhow::bail!("`{}` in {} is not an object", platform, path.display());
                    }
                    section["runtimeVersion"] = json!(fingerprint.get(platform));
                }
                write_json_document(path, &document)
            }
            Location::ReleaseChannel(path) => {
                let mut document = read_json_document(path)?;
                let profiles = document
                    .get_mut("build")
                    .and_then(Value::as_object_mut)
                    .filter(|profiles| !profiles.is_empty())
                    .with_context(|| format!("No build profiles found in {}", path.display()))?;
                for profile in profiles.values_mut().filter(|p| p.is_object()) {
                    profile["releaseChannel"] = json!(fingerprint.all);
                }
                write_json_document(path, &document)
            }
        }
    }
}

/// Non-empty string form of a stored value; non-string values never match a hash
fn stored_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn app_config_root(document: &Value) -> &Value {
    match document.get("expo") {
        Some(expo) if expo.is_object() => expo,
        _ => document,
    }
}

fn build_profiles(document: &Value) -> impl Iterator<Item = (&String, &Value)> {
    document
        .get("build")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|profiles| profiles.iter())
        .filter(|(_, profile)| profile.is_object())
}

fn as_object<'d>(document: &'d mut Value, path: &Path) -> Result<&'d mut Map<String, Value>> {
    document
        .as_object_mut()
        .with_context(|| format!("{} is not a JSON object", path.display()))
}
