//! Configuration loading and resolution.

use std::path::PathBuf;

use cabinet_verify::VerifyConfig;

use crate::types::{McpError, McpResult};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "CABINET_VERIFY_CONFIG";

/// Resolve the config file path: explicit flag, then env var, then
/// `./.cabinet-verify/config.json`, then `~/.cabinet-verify/config.json`.
///
/// Returns `None` when no candidate exists on disk.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(".cabinet-verify/config.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = default_config_path();
    home_config.exists().then_some(home_config)
}

fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(home).join(".cabinet-verify").join("config.json")
}

/// Load the engine configuration. With no config file, defaults apply.
///
/// An explicitly named file that cannot be read is an error.
pub fn load_config(explicit: Option<&str>) -> McpResult<VerifyConfig> {
    let Some(path) = resolve_config_path(explicit) else {
        tracing::debug!("No config file found, using defaults");
        return Ok(VerifyConfig::default());
    };

    let text = std::fs::read_to_string(&path).map_err(|e| {
        McpError::Config(format!("Failed to read {}: {e}", path.display()))
    })?;
    let config = VerifyConfig::from_json(&text)
        .map_err(|e| McpError::Config(format!("Invalid config {}: {e}", path.display())))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(
            resolve_config_path(Some("/tmp/x.json")),
            Some(PathBuf::from("/tmp/x.json"))
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"grid_resolution": 16, "fetch_timeout_secs": 3}"#).unwrap();

        let cfg = load_config(path.to_str()).unwrap();
        assert_eq!(cfg.grid_resolution.get(), 16);
        assert_eq!(cfg.fetch_timeout_secs, 3);
        assert_eq!(cfg.pixel_threshold, 0.3);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = load_config(Some("/nonexistent/cabinet/config.json")).unwrap_err();
        assert!(matches!(err, McpError::Config(_)));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"grid_resolution": 0}"#).unwrap();
        assert!(load_config(path.to_str()).is_err());
    }
}
