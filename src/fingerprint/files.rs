use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::path::Path;

use crate::config::{InputsConfig, ProjectConfig};
use crate::error::ScanError;
use crate::utils::hash::{hash_file, hash_string};

use super::Platform;

/// Compiled path rules deciding which tracked files feed each digest
pub struct PathRules {
    ios: GlobSet,
    android: GlobSet,
    plugins: GlobSet,
}

impl PathRules {
    pub fn from_config(project: &ProjectConfig, inputs: &InputsConfig) -> Result<Self, ScanError> {
        let ios = rooted(&project.ios_dir, &inputs.ios_globs);
        let android = rooted(&project.android_dir, &inputs.android_globs);

        Ok(Self {
            ios: build_glob_set(&ios)?,
            android: build_glob_set(&android)?,
            plugins: build_glob_set(&inputs.plugin_globs)?,
        })
    }

    /// Tracked files relevant to a platform, in listing order
    pub fn native_files(&self, tracked: &[String], platform: Platform) -> Vec<String> {
        tracked
            .iter()
            .filter(|path| {
                (platform.includes_ios() && self.ios.is_match(path.as_str()))
                    || (platform.includes_android() && self.android.is_match(path.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Config plugin files, in listing order
    pub fn plugin_files(&self, tracked: &[String]) -> Vec<String> {
        tracked
            .iter()
            .filter(|path| self.plugins.is_match(path.as_str()))
            .cloned()
            .collect()
    }
}

/// Everything under the native folder, then the extra patterns
fn rooted(dir: &str, extra: &[String]) -> Vec<String> {
    let dir = dir.trim_matches('/');
    std::iter::once(format!("{}/**", globset::escape(dir)))
        .chain(extra.iter().cloned())
        .collect()
}

pub fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    Ok(builder.build()?)
}

/// Digest a list of root-relative files.
///
/// Each file contributes `path@digest`; pairs are joined with `,` in the
/// order given and the joined string is hashed. An empty list yields `""`.
pub fn digest_files(root: &Path, paths: &[String]) -> Result<String, ScanError> {
    if paths.is_empty() {
        return Ok(String::new());
    }

    let pairs = paths
        .par_iter()
        .map(|relative| {
            let path = root.join(relative);
            hash_file(&path)
                .map(|digest| format!("{}@{}", relative, digest))
                .map_err(|source| ScanError::UnreadableFile { path, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(hash_string(&pairs.join(",")))
}
