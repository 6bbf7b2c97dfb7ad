use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{ManifestError, ScanError};

use super::Platform;

const MANIFEST_FILE_NAME: &str = "package.json";
const IOS_DIR: &str = "ios";
const ANDROID_DIR: &str = "android";

/// Native surface identity a package author declares in its own manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeHash {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<String>,
}

impl NativeHash {
    pub fn for_platform(&self, platform: Platform) -> Option<&str> {
        let value = match platform {
            Platform::Ios => self.ios.as_deref(),
            Platform::Android => self.android.as_deref(),
            Platform::All => self.all.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Parse the manifest field; a bare string applies to every platform
    fn from_manifest_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(hash) => Some(Self {
                ios: Some(hash.clone()),
                android: Some(hash.clone()),
                all: Some(hash.clone()),
            }),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

/// An installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub version: String,
    pub is_native_android: bool,
    pub is_native_ios: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_hash: Option<NativeHash>,
}

impl Module {
    pub fn is_native(&self, platform: Platform) -> bool {
        match platform {
            Platform::Ios => self.is_native_ios,
            Platform::Android => self.is_native_android,
            Platform::All => self.is_native_ios || self.is_native_android,
        }
    }

    /// `name@version`, or `name@override` when the package declares one for the platform
    pub fn identity(&self, platform: Platform) -> String {
        let marker = self
            .native_hash
            .as_ref()
            .and_then(|h| h.for_platform(platform))
            .unwrap_or(self.version.as_str());
        format!("{}@{}", self.name, marker)
    }
}

/// Discovers installed packages and classifies them per platform
pub struct ModuleScanner<'a> {
    root: &'a Path,
    packages_dirs: &'a [PathBuf],
    override_field: &'a str,
}

impl<'a> ModuleScanner<'a> {
    pub fn new(root: &'a Path, packages_dirs: &'a [PathBuf], override_field: &'a str) -> Self {
        Self {
            root,
            packages_dirs,
            override_field,
        }
    }

    /// Scan every packages directory, sorted by package name
    pub fn scan(&self) -> Result<Vec<Module>, ScanError> {
        let mut packages = Vec::new();
        for dir in self.packages_dirs {
            let dir = self.root.join(dir);
            collect_packages(&dir, &mut packages)?;
        }

        tracing::debug!(count = packages.len(), "Reading package manifests");

        let mut modules = packages
            .par_iter()
            .map(|(name, path)| self.read_module(name, path))
            .collect::<Result<Vec<_>, _>>()?;

        modules.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));

        Ok(modules)
    }

    fn read_module(&self, name: &str, path: &Path) -> Result<Module, ScanError> {
        let manifest = read_manifest(path).map_err(|source| ScanError::CorruptPackage {
            path: path.to_path_buf(),
            source,
        })?;

        let version = manifest
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let native_hash = manifest.get(self.override_field).and_then(|value| {
            let parsed = NativeHash::from_manifest_value(value);
            if parsed.is_none() {
                tracing::warn!(package = name, field = self.override_field, "Ignoring malformed native hash override");
            }
            parsed
        });

        Ok(Module {
            name: name.to_string(),
            path: path.to_path_buf(),
            version,
            is_native_android: path.join(ANDROID_DIR).is_dir(),
            is_native_ios: path.join(IOS_DIR).is_dir(),
            native_hash,
        })
    }
}

fn read_manifest(package_path: &Path) -> Result<Value, ManifestError> {
    let content = std::fs::read_to_string(package_path.join(MANIFEST_FILE_NAME))?;
    Ok(serde_json::from_str(&content)?)
}

/// Collect `(name, path)` for every package under a packages directory
fn collect_packages(dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<(), ScanError> {
    for (name, path) in list_entries(dir)? {
        if name.starts_with('@') {
            for (sub_name, sub_path) in list_entries(&path)? {
                if sub_path.is_dir() {
                    out.push((format!("{}/{}", name, sub_name), sub_path));
                }
            }
        } else if path.is_dir() {
            out.push((name, path));
        }
    }

    Ok(())
}

/// Non-hidden entries of a directory
fn list_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, ScanError> {
    let setup_error = |source| ScanError::Setup {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(setup_error)? {
        let entry = entry.map_err(setup_error)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        entries.push((name, entry.path()));
    }

    Ok(entries)
}

/// Comma-joined identities of the modules native for a platform, sorted by name
pub fn module_identities(modules: &[Module], platform: Platform) -> String {
    let mut native: Vec<&Module> = modules.iter().filter(|m| m.is_native(platform)).collect();
    native.sort_by(|a, b| a.name.cmp(&b.name));

    native
        .iter()
        .map(|m| m.identity(platform))
        .collect::<Vec<_>>()
        .join(",")
}
