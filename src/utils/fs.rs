use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

/// Replace a file's contents in one step.
///
/// Writes a temp file next to the target and renames it over the original,
/// keeping the original's permissions. The temp file is removed on failure.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let result = replace_with_temp(path, &temp_path, content);
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn replace_with_temp(path: &Path, temp_path: &Path, content: &[u8]) -> Result<()> {
    let mut file = std::fs::File::create(temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    if let Ok(metadata) = std::fs::metadata(path) {
        if metadata.is_file() {
            file.set_permissions(metadata.permissions())
                .with_context(|| format!("Failed to copy permissions of {}", path.display()))?;
        }
    }

    file.sync_all()
        .with_context(|| format!("Failed to flush temp file: {}", temp_path.display()))?;
    drop(file);

    std::fs::rename(temp_path, path)
        .with_context(|| format!("Failed to replace file: {}", path.display()))?;

    Ok(())
}

/// Load a JSON document, treating a missing file as an empty object
pub fn read_json_document(path: &Path) -> Result<Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Value::Object(Map::new()));
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read file: {}", path.display()));
        }
    };

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON document: {}", path.display()))
}

/// Write a JSON document pretty-printed with a trailing newline
pub fn write_json_document(path: &Path, document: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(document)
        .context("Failed to serialize JSON document")?;
    content.push('\n');
    write_atomic(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_document_reads_as_empty_object() {
        let temp_dir = TempDir::new().unwrap();
        let doc = read_json_document(&temp_dir.path().join("app.json")).unwrap();
        assert_eq!(doc, json!({}));
    }

    #[test]
    fn test_document_write_keeps_key_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("package.json");
        std::fs::write(&path, r#"{"name":"app","version":"1.0.0","main":"index.js"}"#).unwrap();

        let mut doc = read_json_document(&path).unwrap();
        doc["version"] = json!("1.0.1");
        write_json_document(&path, &doc).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let name = written.find("\"name\"").unwrap();
        let version = written.find("\"version\"").unwrap();
        let main = written.find("\"main\"").unwrap();
        assert!(name < version && version < main);
        assert!(written.ends_with("}\n"));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_replace_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let target = temp_dir.path().join("occupied");
        std::fs::create_dir_all(target.join("child")).unwrap();

        assert!(write_atomic(&target, b"content").is_err());

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["occupied"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hook.sh");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o750)).unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}
