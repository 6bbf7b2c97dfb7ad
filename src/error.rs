use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures while scanning packages or hashing native inputs
#[derive(Debug, Error)]
pub enum ScanError {
    /// A packages directory is missing or unreadable
    #[error("Cannot read packages directory {} (are dependencies installed?)", .path.display())]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An installed package has an unreadable or malformed manifest
    #[error("Corrupt package at {}: manifest is unreadable", .path.display())]
    CorruptPackage {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("Failed to read file for hashing: {}", .path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read the git index")]
    Vcs(#[from] git2::Error),

    #[error("Failed to walk the project tree")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid path pattern")]
    Pattern(#[from] globset::Error),

    #[error("Failed to start worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
