use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::config::Config;
use crate::error::ScanError;
use crate::utils::hash::hash_string;

use super::{digest_files, module_identities, ConfigNormalizer, Module, ModuleScanner, PathRules, Platform};

/// Per-platform native dependency hashes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub ios: String,
    pub android: String,
    pub all: String,
}

impl Fingerprint {
    pub fn get(&self, platform: Platform) -> &str {
        match platform {
            Platform::Ios => &self.ios,
            Platform::Android => &self.android,
            Platform::All => &self.all,
        }
    }
}

/// Which inputs are left out of the fingerprint
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintOptions {
    pub skip_node_modules: bool,
    pub skip_app_config: bool,
    pub skip_local_native_folders: bool,
    pub include_build_numbers: bool,
    /// Worker threads for manifest and file reads
    pub jobs: Option<usize>,
}

/// Everything a fingerprint is derived from, gathered once for all platforms
struct Inputs<'a> {
    modules: Vec<Module>,
    tracked: &'a [String],
    app_config: Option<&'a Value>,
    plugin_digest: String,
}

pub struct FingerprintEngine<'a> {
    root: &'a Path,
    config: &'a Config,
    options: FingerprintOptions,
}

impl<'a> FingerprintEngine<'a> {
    pub fn new(root: &'a Path, config: &'a Config, options: FingerprintOptions) -> Self {
        Self { root, config, options }
    }

    /// Compute the fingerprint from the tracked file listing and the evaluated app config
    pub fn compute(&self, tracked: &[String], app_config: Option<&Value>) -> Result<Fingerprint, ScanError> {
        thread_pool(self.options.jobs)?.install(|| {
            let rules = PathRules::from_config(&self.config.project, &self.config.inputs)?;
            let inputs = Inputs {
                modules: self.scan_modules()?,
                tracked,
                app_config: app_config.filter(|_| !self.options.skip_app_config),
                plugin_digest: digest_files(self.root, &rules.plugin_files(tracked))?,
            };

            Ok(Fingerprint {
                ios: self.platform_digest(Platform::Ios, &rules, &inputs)?,
                android: self.platform_digest(Platform::Android, &rules, &inputs)?,
                all: self.platform_digest(Platform::All, &rules, &inputs)?,
            })
        })
    }

    fn scan_modules(&self) -> Result<Vec<Module>, ScanError> {
        if self.options.skip_node_modules {
            return Ok(Vec::new());
        }

        let project = &self.config.project;
        ModuleScanner::new(self.root, &project.packages_dirs, &self.config.checkpoint.manifest_field).scan()
    }

    fn platform_digest(&self, platform: Platform, rules: &PathRules, inputs: &Inputs) -> Result<String, ScanError> {
        let local_digest = if self.options.skip_local_native_folders || !self.has_native_folder(platform) {
            String::new()
        } else {
            digest_files(self.root, &rules.native_files(inputs.tracked, platform))?
        };

        let config_digest = inputs
            .app_config
            .map(|config| {
                ConfigNormalizer::new(&self.config.normalize)
                    .with_build_numbers(self.options.include_build_numbers)
                    .digest(config, platform)
            })
            .unwrap_or_default();

        let identities = module_identities(&inputs.modules, platform);
        let composed = compose(&config_digest, &local_digest, &identities, &inputs.plugin_digest);
        tracing::debug!(%platform, %composed, "Composed fingerprint input");

        Ok(hash_string(&composed))
    }

    fn has_native_folder(&self, platform: Platform) -> bool {
        let project = &self.config.project;
        (platform.includes_ios() && self.root.join(&project.ios_dir).is_dir())
            || (platform.includes_android() && self.root.join(&project.android_dir).is_dir())
    }
}

/// Worker pool for manifest and file reads, one thread per CPU unless `jobs` is given
pub fn thread_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool, ScanError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.unwrap_or_else(num_cpus::get))
        .build()?)
}

/// Labeled segments hashed into a platform digest; the format is part of every stored hash
pub fn compose(config_digest: &str, local_digest: &str, identities: &str, plugin_digest: &str) -> String {
    format!(
        "app.json@{};local@{};{};plugins@{}",
        config_digest, local_digest, identities, plugin_digest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
            Self { dir }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn write(&self, relative: &str, content: &str) {
            let path = self.root().join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        fn package(&self, name: &str, manifest: serde_json::Value, native_dirs: &[&str]) {
            self.write(&format!("node_modules/{}/package.json", name), &manifest.to_string());
            for dir in native_dirs {
                std::fs::create_dir_all(self.root().join("node_modules").join(name).join(dir)).unwrap();
            }
        }

        fn fingerprint(&self, tracked: &[&str], app_config: Option<&Value>) -> Fingerprint {
            self.fingerprint_with(tracked, app_config, FingerprintOptions::default())
        }

        fn fingerprint_with(&self, tracked: &[&str], app_config: Option<&Value>, options: FingerprintOptions) -> Fingerprint {
            let config = Config::default();
            let tracked: Vec<String> = tracked.iter().map(|p| p.to_string()).collect();
            FingerprintEngine::new(self.root(), &config, options)
                .compute(&tracked, app_config)
                .unwrap()
        }
    }

    const TRACKED: &[&str] = &["android/app/build.gradle", "ios/Podfile", "src/App.tsx"];

    fn native_project() -> Project {
        let project = Project::new();
        project.write("android/app/build.gradle", "apply plugin: 'com.android.application'");
        project.write("ios/Podfile", "platform :ios, '13.0'");
        project.write("src/App.tsx", "export default function App() {}");
        project.package("react-native-camera", json!({"version": "4.2.1"}), &["ios", "android"]);
        project.package("lodash", json!({"version": "4.17.21"}), &[]);
        project
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let project = native_project();
        let config = json!({"jsEngine": "hermes"});

        let first = project.fingerprint(TRACKED, Some(&config));
        let second = project.fingerprint(TRACKED, Some(&config));
        assert_eq!(first, second);
        assert_ne!(first.ios, first.android);
        assert_ne!(first.all, first.ios);
    }

    #[test]
    fn test_android_change_leaves_ios_digest() {
        let project = native_project();
        let before = project.fingerprint(TRACKED, None);

        project.write("android/app/build.gradle", "apply plugin: 'com.android.library'");
        let after = project.fingerprint(TRACKED, None);

        assert_eq!(before.ios, after.ios);
        assert_ne!(before.android, after.android);
        assert_ne!(before.all, after.all);
    }

    #[test]
    fn test_ios_change_leaves_android_digest() {
        let project = native_project();
        let before = project.fingerprint(TRACKED, None);

        project.write("ios/Podfile", "platform :ios, '14.0'");
        let after = project.fingerprint(TRACKED, None);

        assert_ne!(before.ios, after.ios);
        assert_eq!(before.android, after.android);
        assert_ne!(before.all, after.all);
    }

    #[test]
    fn test_js_only_change_leaves_every_digest() {
        let project = native_project();
        let before = project.fingerprint(TRACKED, None);

        project.write("src/App.tsx", "export default function App() { return null }");
        assert_eq!(before, project.fingerprint(TRACKED, None));
    }

    #[test]
    fn test_override_precedence() {
        let project = native_project();
        project.package(
            "native-lib",
            json!({"version": "0.0.2", "nativeDependencyHash": {"ios": "X", "android": "Y", "all": "Z"}}),
            &["ios", "android"],
        );
        let before = project.fingerprint(TRACKED, None);

        project.package(
            "native-lib",
            json!({"version": "0.0.3", "nativeDependencyHash": {"ios": "X", "android": "Y", "all": "Z"}}),
            &["ios", "android"],
        );
        assert_eq!(before, project.fingerprint(TRACKED, None));

        project.package(
            "native-lib",
            json!({"version": "0.0.3", "nativeDependencyHash": {"ios": "X", "android": "Y2", "all": "Z2"}}),
            &["ios", "android"],
        );
        let after = project.fingerprint(TRACKED, None);
        assert_eq!(before.ios, after.ios);
        assert_ne!(before.android, after.android);
        assert_ne!(before.all, after.all);
    }

    #[test]
    fn test_non_native_package_is_ignored() {
        let project = native_project();
        let before = project.fingerprint(TRACKED, None);

        project.package("lodash", json!({"version": "4.17.22"}), &[]);
        assert_eq!(before, project.fingerprint(TRACKED, None));
    }

    #[test]
    fn test_out_of_allow_list_config_change_is_ignored() {
        let project = native_project();
        let before = project.fingerprint(TRACKED, Some(&json!({"name": "one", "jsEngine": "hermes"})));
        let after = project.fingerprint(TRACKED, Some(&json!({"name": "two", "jsEngine": "hermes"})));
        assert_eq!(before, after);

        let engine_changed = project.fingerprint(TRACKED, Some(&json!({"name": "two", "jsEngine": "jsc"})));
        assert_ne!(before.all, engine_changed.all);
    }

    #[test]
    fn test_plugin_file_affects_every_platform() {
        let project = native_project();
        project.write("plugins/app.plugin.js", "module.exports = (c) => c;");
        let tracked = ["android/app/build.gradle", "ios/Podfile", "plugins/app.plugin.js", "src/App.tsx"];
        let before = project.fingerprint(&tracked, None);

        project.write("plugins/app.plugin.js", "module.exports = (c) => ({ ...c });");
        let after = project.fingerprint(&tracked, None);

        assert_ne!(before.ios, after.ios);
        assert_ne!(before.android, after.android);
        assert_ne!(before.all, after.all);
    }

    #[test]
    fn test_skip_flags_produce_empty_segments() {
        let project = native_project();
        let options = FingerprintOptions {
            skip_node_modules: true,
            skip_app_config: true,
            skip_local_native_folders: true,
            ..FingerprintOptions::default()
        };

        let fingerprint = project.fingerprint_with(TRACKED, Some(&json!({"jsEngine": "hermes"})), options);
        let empty = hash_string(&compose("", "", "", ""));
        assert_eq!(fingerprint.ios, empty);
        assert_eq!(fingerprint.android, empty);
        assert_eq!(fingerprint.all, empty);
    }

    #[test]
    fn test_missing_native_folder_skips_local_digest() {
        let project = Project::new();
        project.write("ios/Podfile", "platform :ios");
        let options = FingerprintOptions {
            skip_node_modules: true,
            ..FingerprintOptions::default()
        };

        let fingerprint = project.fingerprint_with(&["ios/Podfile"], None, options);
        assert_eq!(fingerprint.android, hash_string(&compose("", "", "", "")));
        assert_ne!(fingerprint.ios, fingerprint.android);
    }

    #[test]
    fn test_custom_native_folder_is_hashed() {
        let project = Project::new();
        project.write("native/ios/Podfile", "platform :ios, '13.0'");

        let mut config = Config::default();
        config.project.ios_dir = "native/ios".to_string();
        let options = FingerprintOptions {
            skip_node_modules: true,
            ..FingerprintOptions::default()
        };
        let tracked = vec!["native/ios/Podfile".to_string()];
        let compute = || {
            FingerprintEngine::new(project.root(), &config, options)
                .compute(&tracked, None)
                .unwrap()
        };

        let before = compute();
        assert_ne!(before.ios, hash_string(&compose("", "", "", "")));

        project.write("native/ios/Podfile", "platform :ios, '14.0'");
        let after = compute();
        assert_ne!(before.ios, after.ios);
        assert_eq!(before.android, after.android);
    }

    #[test]
    fn test_thread_pool_honors_jobs() {
        assert_eq!(thread_pool(Some(2)).unwrap().current_num_threads(), 2);
    }

    #[test]
    fn test_compose_format() {
        assert_eq!(
            compose("c", "l", "a@1,b@2", "p"),
            "app.json@c;local@l;a@1,b@2;plugins@p"
        );
    }
}
