use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::checkpoint::LocationOverrides;
use crate::fingerprint::{FingerprintOptions, Platform};

#[derive(Parser)]
#[command(
    name = "native-dep-hash",
    version,
    about = "Fingerprint the native surface of a React Native / Expo project",
    long_about = "native-dep-hash - Detect when a new native binary is required.\n\n\
                  Hashes native modules, native-relevant app config and native source files\n\
                  into per-platform digests, and checks them against a committed checkpoint\n\
                  so CI can tell an over-the-air update from a store release."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (default: search upwards for native-dep-hash.toml)
    #[arg(short, long, global = true, env = "NATIVE_DEP_HASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check an app's native hash against its checkpoint
    Verify {
        #[command(flatten)]
        fingerprint: FingerprintArgs,

        #[command(flatten)]
        checkpoint: AppCheckpointArgs,
    },

    /// Check a library's native hash against its package.json
    VerifyLibrary {
        #[command(flatten)]
        checkpoint: LibraryCheckpointArgs,
    },

    /// Store an app's native hash in its checkpoint locations
    Update {
        #[command(flatten)]
        fingerprint: FingerprintArgs,

        #[command(flatten)]
        checkpoint: AppCheckpointArgs,
    },

    /// Store a library's native hash in its package.json
    UpdateLibrary {
        #[command(flatten)]
        checkpoint: LibraryCheckpointArgs,
    },

    /// List installed native modules
    List {
        /// Only modules native for this platform
        #[arg(short, long, default_value = "all")]
        platform: Platform,

        /// Print modules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the native hash (for piping)
    Hash {
        /// Platform to print
        #[arg(short, long, default_value = "all")]
        platform: Platform,

        /// Print all three hashes as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        fingerprint: FingerprintArgs,
    },

    /// Initialize a new native-dep-hash.toml configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Clone, Default)]
pub struct FingerprintArgs {
    /// Leave installed packages out of the hash
    #[arg(long)]
    pub skip_node_modules: bool,

    /// Leave the app config out of the hash
    #[arg(long)]
    pub skip_app_config: bool,

    /// Leave ios/ and android/ file contents out of the hash
    #[arg(long)]
    pub skip_local_native_folders: bool,

    /// Hash ios.buildNumber and android.versionCode too
    #[arg(long)]
    pub include_build_numbers: bool,
}

impl FingerprintArgs {
    pub fn options(&self, jobs: Option<usize>) -> FingerprintOptions {
        FingerprintOptions {
            skip_node_modules: self.skip_node_modules,
            skip_app_config: self.skip_app_config,
            skip_local_native_folders: self.skip_local_native_folders,
            include_build_numbers: self.include_build_numbers,
            jobs,
        }
    }
}

#[derive(Args, Clone, Default)]
pub struct AppCheckpointArgs {
    /// Refuse to run when tracked files have uncommitted changes
    #[arg(long)]
    pub require_clean: bool,

    /// Also check/store runtimeVersion in the app config
    #[arg(long)]
    pub runtime_version: bool,

    /// Also check/store releaseChannel in every build profile
    #[arg(long)]
    pub release_channel: bool,

    /// Do not use the sidecar checkpoint file
    #[arg(long)]
    pub no_sidecar: bool,
}

impl AppCheckpointArgs {
    pub fn overrides(&self) -> LocationOverrides {
        LocationOverrides {
            no_sidecar: self.no_sidecar,
            runtime_version: self.runtime_version,
            release_channel: self.release_channel,
        }
    }
}

#[derive(Args, Clone, Default)]
pub struct LibraryCheckpointArgs {
    /// Refuse to run when tracked files have uncommitted changes
    #[arg(long)]
    pub require_clean: bool,

    /// package.json field holding the hashes
    #[arg(long)]
    pub field: Option<String>,
}
