//! Config file location and loading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the config directory.
/// Priority: `MODHOST_CONFIG_DIR` env > `~/.modhost/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MODHOST_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".modhost"),
        None => PathBuf::from(".modhost"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped tree, before env substitution.
///
/// Returns `Ok(None)` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as YAML null.
    let value: Value = serde_yaml::from_str::<Option<Value>>(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?
        .unwrap_or(Value::Null);

    info!(path = %path.display(), "Loaded config");
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(&config_file_path(dir.path())).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn reads_yaml_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "logging:\n  level: warn\n").unwrap();
        let loaded = load_config(&path).await.unwrap().unwrap();
        assert_eq!(loaded["logging"]["level"], "warn");
    }

    #[tokio::test]
    async fn malformed_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "logging: [unclosed\n").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }
}
