use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{AllowList, NormalizeConfig};
use crate::utils::hash::hash_string;

use super::Platform;

const ENTITLEMENTS_KEY: &str = "entitlements";
const BUNDLE_ID_KEY: &str = "bundleIdentifier";

/// Where the raw app config comes from
#[derive(Debug, Clone)]
pub struct AppConfigSource {
    /// External evaluator printing JSON on stdout; skipped when empty
    pub command: Vec<String>,
    /// Static JSON document, relative to the project root
    pub file: PathBuf,
}

impl AppConfigSource {
    /// Evaluate the app config; `None` when no source produced a JSON object
    pub fn load(&self, root: &Path) -> Option<Value> {
        if !self.command.is_empty() {
            match self.run_command(root) {
                Ok(value) => return Some(unwrap_expo(value)),
                Err(e) => tracing::warn!("App config command failed, falling back to {}: {e:#}", self.file.display()),
            }
        }

        let path = root.join(&self.file);
        match read_static(&path) {
            Ok(value) => Some(unwrap_expo(value)),
            Err(e) => {
                tracing::debug!("No app config available ({e:#}), hashing without it");
                None
            }
        }
    }

    fn run_command(&self, root: &Path) -> anyhow::Result<Value> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("empty app config command"))?;

        tracing::debug!(command = %self.command.join(" "), "Evaluating app config");
        let output = Command::new(program).args(args).current_dir(root).output()?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let value: Value = serde_json::from_slice(&output.stdout)?;
        if !value.is_object() {
            anyhow::bail!("app config is not a JSON object");
        }
        Ok(value)
    }
}

fn read_static(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    if !value.is_object() {
        anyhow::bail!("{} is not a JSON object", path.display());
    }
    Ok(value)
}

/// Static app.json files wrap the config in an `expo` object
fn unwrap_expo(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("expo").is_some_and(Value::is_object) => {
            map.remove("expo").unwrap_or_default()
        }
        other => other,
    }
}

/// Prunes an app config down to the fields whose change requires a new
/// native build. The digest hashes the pruned config with sorted keys, so
/// equal configs hash identically whatever their key order.
pub struct ConfigNormalizer<'a> {
    rules: &'a NormalizeConfig,
    include_build_numbers: bool,
}

impl<'a> ConfigNormalizer<'a> {
    pub fn new(rules: &'a NormalizeConfig) -> Self {
        Self {
            rules,
            include_build_numbers: rules.include_build_numbers,
        }
    }

    pub fn with_build_numbers(mut self, include: bool) -> Self {
        self.include_build_numbers = self.include_build_numbers || include;
        self
    }

    /// Digest of the canonical pruned config for a platform
    pub fn digest(&self, config: &Value, platform: Platform) -> String {
        hash_string(&canonical_json(&self.prune(config, platform)))
    }

    /// Return a new config holding only allow-listed fields for the platform
    pub fn prune(&self, config: &Value, platform: Platform) -> Value {
        let Some(root) = config.as_object() else {
            return Value::Object(Map::new());
        };

        let bundle_id = root
            .get("ios")
            .and_then(|ios| ios.get(BUNDLE_ID_KEY))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty());

        let (ios_extra, android_extra): (&[&str], &[&str]) = if self.include_build_numbers {
            (&["buildNumber"], &["versionCode"])
        } else {
            (&[], &[])
        };

        let mut pruned = Map::new();
        for (key, value) in root {
            if !retained(&self.rules.root, key) {
                continue;
            }

            let value = match key.as_str() {
                "ios" if !platform.includes_ios() => continue,
                "android" if !platform.includes_android() => continue,
                "ios" => {
                    let mut ios = prune_section(value, &self.rules.ios, ios_extra);
                    if self.rules.redact_bundle_id {
                        if let Some(bundle_id) = bundle_id {
                            self.redact_entitlements(&mut ios, bundle_id);
                        }
                    }
                    ios
                }
                "android" => prune_section(value, &self.rules.android, android_extra),
                _ => value.clone(),
            };
            pruned.insert(key.clone(), value);
        }

        Value::Object(pruned)
    }

    fn redact_entitlements(&self, ios: &mut Value, bundle_id: &str) {
        let Some(entitlements) = ios.get_mut(ENTITLEMENTS_KEY).and_then(Value::as_object_mut) else {
            return;
        };

        let keys = &self.rules.redact_entitlement_keys;
        for (key, value) in entitlements.iter_mut() {
            if keys.is_empty() || keys.contains(key) {
                redact(value, bundle_id);
            }
        }
    }
}

fn retained(allow_list: &AllowList, key: &str) -> bool {
    allow_list.get(key).copied().unwrap_or(false)
}

fn prune_section(value: &Value, allow_list: &AllowList, extra: &[&str]) -> Value {
    match value.as_object() {
        Some(section) => Value::Object(
            section
                .iter()
                .filter(|(key, _)| retained(allow_list, key) || extra.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        None => value.clone(),
    }
}

fn redact(value: &mut Value, bundle_id: &str) {
    match value {
        Value::String(s) if s.contains(bundle_id) => *s = s.replace(bundle_id, ""),
        Value::Array(items) => items.iter_mut().for_each(|item| redact(item, bundle_id)),
        _ => {}
    }
}

/// Compact JSON with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|key| (key.clone(), sort_keys(&map[key])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_config() -> Value {
        json!({
            "name": "My App",
            "slug": "my-app",
            "version": "1.2.3",
            "jsEngine": "hermes",
            "plugins": ["expo-camera"],
            "ios": {
                "bundleIdentifier": "com.example.app",
                "buildNumber": "42",
                "infoPlist": { "NSCameraUsageDescription": "Scan codes" },
                "entitlements": {
                    "com.apple.developer.associated-domains": ["applinks:com.example.app.link"],
                    "aps-environment": "production"
                }
            },
            "android": {
                "package": "com.example.app",
                "versionCode": 7,
                "permissions": ["CAMERA"],
                "blockedPermissions": ["RECORD_AUDIO"]
            }
        })
    }

    #[test]
    fn test_prune_keeps_only_allow_listed_fields() {
        let rules = NormalizeConfig::default();
        let pruned = ConfigNormalizer::new(&rules).prune(&sample_config(), Platform::All);

        assert_eq!(
            pruned,
            json!({
                "jsEngine": "hermes",
                "plugins": ["expo-camera"],
                "ios": {
                    "infoPlist": { "NSCameraUsageDescription": "Scan codes" },
                    "entitlements": {
                        "com.apple.developer.associated-domains": ["applinks:.link"],
                        "aps-environment": "production"
                    }
                },
                "android": {
                    "permissions": ["CAMERA"],
                    "blockedPermissions": ["RECORD_AUDIO"]
                }
            })
        );
    }

    #[test]
    fn test_prune_does_not_mutate_input() {
        let rules = NormalizeConfig::default();
        let config = sample_config();
        let before = config.clone();
        ConfigNormalizer::new(&rules).prune(&config, Platform::Ios);
        assert_eq!(config, before);
    }

    #[test]
    fn test_single_platform_drops_other_section() {
        let rules = NormalizeConfig::default();
        let normalizer = ConfigNormalizer::new(&rules);

        let ios = normalizer.prune(&sample_config(), Platform::Ios);
        assert!(ios.get("ios").is_some());
        assert!(ios.get("android").is_none());

        let android = normalizer.prune(&sample_config(), Platform::Android);
        assert!(android.get("android").is_some());
        assert!(android.get("ios").is_none());
    }

    #[test]
    fn test_out_of_allow_list_change_keeps_digest() {
        let rules = NormalizeConfig::default();
        let normalizer = ConfigNormalizer::new(&rules);
        let mut changed = sample_config();
        changed["version"] = json!("2.0.0");
        changed["ios"]["buildNumber"] = json!("43");
        changed["android"]["package"] = json!("com.example.other");

        for platform in Platform::EVERY {
            assert_eq!(
                normalizer.digest(&sample_config(), platform),
                normalizer.digest(&changed, platform)
            );
        }
    }

    #[test]
    fn test_allow_listed_change_alters_digest() {
        let rules = NormalizeConfig::default();
        let normalizer = ConfigNormalizer::new(&rules);
        let mut changed = sample_config();
        changed["android"]["permissions"] = json!(["CAMERA", "INTERNET"]);

        assert_eq!(
            normalizer.digest(&sample_config(), Platform::Ios),
            normalizer.digest(&changed, Platform::Ios)
        );
        assert_ne!(
            normalizer.digest(&sample_config(), Platform::Android),
            normalizer.digest(&changed, Platform::Android)
        );
        assert_ne!(
            normalizer.digest(&sample_config(), Platform::All),
            normalizer.digest(&changed, Platform::All)
        );
    }

    #[test]
    fn test_bundle_id_redaction_in_entitlements() {
        let rules = NormalizeConfig::default();
        let normalizer = ConfigNormalizer::new(&rules);

        let with_id = json!({
            "ios": {
                "bundleIdentifier": "com.example.app",
                "entitlements": { "com.apple.security.application-groups": "group.com.example.app" }
            }
        });
        let without_id = json!({
            "ios": {
                "bundleIdentifier": "com.example.app",
                "entitlements": { "com.apple.security.application-groups": "group." }
            }
        });

        assert_eq!(
            normalizer.digest(&with_id, Platform::Ios),
            normalizer.digest(&without_id, Platform::Ios)
        );
    }

    #[test]
    fn test_redaction_can_be_limited_to_keys() {
        let rules = NormalizeConfig {
            redact_entitlement_keys: vec!["keychain-access-groups".to_string()],
            ..NormalizeConfig::default()
        };
        let config = json!({
            "ios": {
                "bundleIdentifier": "com.example.app",
                "entitlements": {
                    "keychain-access-groups": "$(AppIdentifierPrefix)com.example.app",
                    "com.apple.security.application-groups": "group.com.example.app"
                }
            }
        });

        let pruned = ConfigNormalizer::new(&rules).prune(&config, Platform::Ios);
        assert_eq!(pruned["ios"]["entitlements"]["keychain-access-groups"], json!("$(AppIdentifierPrefix)"));
        assert_eq!(
            pruned["ios"]["entitlements"]["com.apple.security.application-groups"],
            json!("group.com.example.app")
        );
    }

    #[test]
    fn test_build_numbers_flag() {
        let rules = NormalizeConfig::default();
        let pruned = ConfigNormalizer::new(&rules)
            .with_build_numbers(true)
            .prune(&sample_config(), Platform::All);

        assert_eq!(pruned["ios"]["buildNumber"], json!("42"));
        assert_eq!(pruned["android"]["versionCode"], json!(7));
    }

    #[test]
    fn test_canonical_json_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"b":{"y":1,"x":[{"k":2,"j":1}]},"a":true}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":true,"b":{"x":[{"j":1,"k":2}],"y":1}}"#).unwrap();

        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"a":true,"b":{"x":[{"j":1,"k":2}],"y":1}}"#);
    }

    #[test]
    fn test_load_static_app_json_unwraps_expo() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("app.json"),
            r#"{"expo":{"name":"demo","jsEngine":"jsc"}}"#,
        )
        .unwrap();

        let source = AppConfigSource {
            command: Vec::new(),
            file: PathBuf::from("app.json"),
        };
        let config = source.load(temp_dir.path()).unwrap();
        assert_eq!(config["jsEngine"], json!("jsc"));
    }

    #[test]
    fn test_failed_command_falls_back_then_degrades() {
        let temp_dir = TempDir::new().unwrap();
        let source = AppConfigSource {
            command: vec!["definitely-not-a-real-config-tool".to_string()],
            file: PathBuf::from("app.json"),
        };
        assert!(source.load(temp_dir.path()).is_none());

        std::fs::write(temp_dir.path().join("app.json"), r#"{"jsEngine":"hermes"}"#).unwrap();
        assert_eq!(source.load(temp_dir.path()).unwrap()["jsEngine"], json!("hermes"));
    }
}
