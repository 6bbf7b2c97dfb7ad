use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Config field name to "retain" flag
pub type AllowList = BTreeMap<String, bool>;

/// Root configuration structure for native-dep-hash.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,

    /// Path rules selecting hashed native files
    #[serde(default)]
    pub inputs: InputsConfig,

    /// App config pruning rules
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Where checkpoints are stored
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Installed package roots, relative to the project root
    #[serde(default = "default_packages_dirs")]
    pub packages_dirs: Vec<PathBuf>,

    /// Name of the iOS native folder
    #[serde(default = "default_ios_dir")]
    pub ios_dir: String,

    /// Name of the Android native folder
    #[serde(default = "default_android_dir")]
    pub android_dir: String,

    /// Command that prints the evaluated app config as JSON (empty to disable)
    #[serde(default = "default_app_config_command")]
    pub app_config_command: Vec<String>,

    /// Static app config read when the command is disabled or fails
    #[serde(default = "default_app_config_file")]
    pub app_config_file: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            packages_dirs: default_packages_dirs(),
            ios_dir: default_ios_dir(),
            android_dir: default_android_dir(),
            app_config_command: default_app_config_command(),
            app_config_file: default_app_config_file(),
        }
    }
}

fn default_packages_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("node_modules")]
}

fn default_ios_dir() -> String {
    "ios".to_string()
}

fn default_android_dir() -> String {
    "android".to_string()
}

fn default_app_config_command() -> Vec<String> {
    ["npx", "expo", "config", "--json", "--type", "public"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_app_config_file() -> PathBuf {
    PathBuf::from("app.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    /// Tracked files relevant to iOS builds besides everything under `project.ios_dir`
    #[serde(default = "default_ios_globs")]
    pub ios_globs: Vec<String>,

    /// Tracked files relevant to Android builds besides everything under `project.android_dir`
    #[serde(default)]
    pub android_globs: Vec<String>,

    /// Config plugin files, hashed for every platform
    #[serde(default = "default_plugin_globs")]
    pub plugin_globs: Vec<String>,

    /// Build output left out of the directory walk used outside git
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            ios_globs: default_ios_globs(),
            android_globs: Vec::new(),
            plugin_globs: default_plugin_globs(),
            exclude_globs: default_exclude_globs(),
        }
    }
}

fn default_ios_globs() -> Vec<String> {
    vec!["**/*.podspec".to_string()]
}

fn default_plugin_globs() -> Vec<String> {
    vec!["**/app.plugin.js".to_string()]
}

fn default_exclude_globs() -> Vec<String> {
    ["**/Pods/**", "**/build/**", "**/.cxx/**"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Top-level app config keys
    #[serde(default = "default_root_allow_list")]
    pub root: AllowList,

    /// Keys inside the `ios` section
    #[serde(default = "default_ios_allow_list")]
    pub ios: AllowList,

    /// Keys inside the `android` section
    #[serde(default = "default_android_allow_list")]
    pub android: AllowList,

    /// Strip the app's bundle identifier from entitlement strings
    #[serde(default = "default_true")]
    pub redact_bundle_id: bool,

    /// Limit redaction to these entitlement keys (empty means all)
    #[serde(default)]
    pub redact_entitlement_keys: Vec<String>,

    /// Also retain `ios.buildNumber` and `android.versionCode`
    #[serde(default)]
    pub include_build_numbers: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            root: default_root_allow_list(),
            ios: default_ios_allow_list(),
            android: default_android_allow_list(),
            redact_bundle_id: true,
            redact_entitlement_keys: Vec::new(),
            include_build_numbers: false,
        }
    }
}

fn allow_list(keys: &[&str]) -> AllowList {
    keys.iter().map(|k| (k.to_string(), true)).collect()
}

fn default_root_allow_list() -> AllowList {
    allow_list(&["ios", "android", "jsEngine", "plugins"])
}

fn default_ios_allow_list() -> AllowList {
    allow_list(&["entitlements", "infoPlist", "jsEngine"])
}

fn default_android_allow_list() -> AllowList {
    allow_list(&["permissions", "blockedPermissions", "jsEngine"])
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Store the combined hash in a one-line sidecar file
    #[serde(default = "default_true")]
    pub sidecar: bool,

    /// Sidecar file name
    #[serde(default = "default_checkpoint_file")]
    pub file: PathBuf,

    /// package.json field holding a library's hashes (also read as the override)
    #[serde(default = "default_manifest_field")]
    pub manifest_field: String,

    /// Store hashes in the app config's runtimeVersion fields
    #[serde(default)]
    pub runtime_version: bool,

    /// App config document receiving runtimeVersion
    #[serde(default = "default_app_config_file")]
    pub app_config_path: PathBuf,

    /// Store the combined hash in every build profile's releaseChannel
    #[serde(default)]
    pub release_channel: bool,

    /// Build profile document
    #[serde(default = "default_eas_path")]
    pub eas_path: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            sidecar: true,
            file: default_checkpoint_file(),
            manifest_field: default_manifest_field(),
            runtime_version: false,
            app_config_path: default_app_config_file(),
            release_channel: false,
            eas_path: default_eas_path(),
        }
    }
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from(".native-dep-hash")
}

fn default_manifest_field() -> String {
    "nativeDependencyHash".to_string()
}

fn default_eas_path() -> PathBuf {
    PathBuf::from("eas.json")
}

impl Config {
    /// Generate default TOML content
    pub fn default_toml() -> String {
        r#"[project]
packages_dirs = ["node_modules"]
ios_dir = "ios"
android_dir = "android"
# Set to [] to read app_config_file directly
app_config_command = ["npx", "expo", "config", "--json", "--type", "public"]
app_config_file = "app.json"

[inputs]
# Everything under ios_dir / android_dir is always hashed for its platform
ios_globs = ["**/*.podspec"]
android_globs = []
plugin_globs = ["**/app.plugin.js"]
# Only applied when the project is not in a git repository
exclude_globs = ["**/Pods/**", "**/build/**", "**/.cxx/**"]

[normalize]
redact_bundle_id = true
# Restrict redaction to specific entitlements, e.g. ["com.apple.developer.associated-domains"]
redact_entitlement_keys = []
include_build_numbers = false

[normalize.root]
ios = true
android = true
jsEngine = true
plugins = true

[normalize.ios]
entitlements = true
infoPlist = true
jsEngine = true

[normalize.android]
permissions = true
blockedPermissions = true
jsEngine = true

[checkpoint]
sidecar = true
file = ".native-dep-hash"
manifest_field = "nativeDependencyHash"
runtime_version = false
app_config_path = "app.json"
release_channel = false
eas_path = "eas.json"
"#
        .to_string()
    }
}
