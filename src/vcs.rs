use git2::{ErrorCode, Repository, StatusOptions};
use globset::GlobSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::fingerprint::build_glob_set;

/// Source of the project's tracked files.
///
/// Only version-controlled files feed a fingerprint, so build output and
/// ignored files never change it.
pub trait TrackedFiles {
    /// Root-relative, `/`-separated paths in a stable sorted order
    fn list(&self) -> Result<Vec<String>, ScanError>;

    /// Whether tracked files under the project root have uncommitted changes
    fn is_dirty(&self) -> Result<bool, ScanError>;

    /// Whether `is_dirty` reflects real version control state
    fn is_versioned(&self) -> bool {
        true
    }

    fn describe(&self) -> &'static str;
}

/// Pick the git index when the root is inside a repository, else walk the tree
pub fn tracked_files(
    root: &Path,
    skip_dirs: &[PathBuf],
    exclude_globs: &[String],
) -> Result<Box<dyn TrackedFiles>, ScanError> {
    match GitTrackedFiles::discover(root)? {
        Some(git) => Ok(Box::new(git)),
        None => {
            tracing::debug!("No git repository found, walking {}", root.display());
            Ok(Box::new(WalkedFiles::new(root, skip_dirs, exclude_globs)?))
        }
    }
}

/// Files in the git index under the project root
pub struct GitTrackedFiles {
    repo: Repository,
    /// Project root relative to the work tree, `/`-separated, empty at the top
    prefix: String,
}

impl GitTrackedFiles {
    pub fn discover(root: &Path) -> Result<Option<Self>, ScanError> {
        let repo = match Repository::discover(root) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some(workdir) = repo.workdir() else {
            return Ok(None);
        };

        let prefix = match (std::fs::canonicalize(root), std::fs::canonicalize(workdir)) {
            (Ok(root), Ok(workdir)) => root
                .strip_prefix(&workdir)
                .map(to_slash_path)
                .unwrap_or_default(),
            _ => String::new(),
        };

        Ok(Some(Self { repo, prefix }))
    }

    fn relative<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix.is_empty() {
            return Some(path);
        }
        path.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

impl TrackedFiles for GitTrackedFiles {
    fn list(&self) -> Result<Vec<String>, ScanError> {
        let index = self.repo.index()?;

        let mut files: Vec<String> = index
            .iter()
            .filter_map(|entry| {
                let path = String::from_utf8_lossy(&entry.path);
                self.relative(&path).map(str::to_string)
            })
            .collect();

        // Conflicted paths appear once per stage
        files.dedup();

        Ok(files)
    }

    fn is_dirty(&self) -> Result<bool, ScanError> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        if !self.prefix.is_empty() {
            options.pathspec(self.prefix.as_str());
        }

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    fn describe(&self) -> &'static str {
        "git index"
    }
}

/// Every file under the root, minus hidden entries, package directories and
/// build output matched by the exclude globs
pub struct WalkedFiles {
    root: PathBuf,
    skip_dirs: Vec<PathBuf>,
    excludes: GlobSet,
}

impl WalkedFiles {
    pub fn new(root: &Path, skip_dirs: &[PathBuf], exclude_globs: &[String]) -> Result<Self, ScanError> {
        Ok(Self {
            root: root.to_path_buf(),
            skip_dirs: skip_dirs.iter().map(|dir| root.join(dir)).collect(),
            excludes: build_glob_set(exclude_globs)?,
        })
    }
}

impl TrackedFiles for WalkedFiles {
    fn list(&self) -> Result<Vec<String>, ScanError> {
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            !hidden && !self.skip_dirs.iter().any(|dir| entry.path() == dir)
        });

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let relative = to_slash_path(relative);
                if !self.excludes.is_match(relative.as_str()) {
                    files.push(relative);
                }
            }
        }

        // Same byte order as a git index listing
        files.sort();

        Ok(files)
    }

    fn is_dirty(&self) -> Result<bool, ScanError> {
        Ok(false)
    }

    fn is_versioned(&self) -> bool {
        false
    }

    fn describe(&self) -> &'static str {
        "directory walk"
    }
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
