//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// TOML configuration file contents (`~/.config/fwip/fwip-re.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root data folder (holds fwip.db)
    pub root_folder: Option<String>,
    /// Bind address override (default 127.0.0.1:5741)
    pub bind_address: Option<String>,
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `FWIP_ROOT_FOLDER` environment variable
/// 3. TOML config file `root_folder`
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var("FWIP_ROOT_FOLDER") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Ok(config) = load_toml_config(None) {
        if let Some(root) = config.root_folder {
            return PathBuf::from(root);
        }
    }

    default_root_folder()
}

/// Load the TOML config from `path`, or from the default location when None.
///
/// A missing file is not an error; it yields the default (empty) config.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Write the TOML config back (best-effort persistence of settings changes)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Default configuration file path for the platform
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fwip").join("fwip-re.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fwip"))
        .unwrap_or_else(|| PathBuf::from("./fwip_data"))
}

/// Ensure the root folder exists and return the database path inside it
pub fn ensure_root_folder(root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    Ok(root.join("fwip.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_arg_wins() {
        let root = resolve_root_folder(Some("/tmp/fwip-test-root"));
        assert_eq!(root, PathBuf::from("/tmp/fwip-test-root"));
    }

    #[test]
    fn test_missing_config_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let config = load_toml_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.root_folder.is_none());
        assert!(config.bind_address.is_none());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fwip-re.toml");

        let config = TomlConfig {
            root_folder: Some("/data/fwip".to_string()),
            bind_address: Some("127.0.0.1:6000".to_string()),
        };
        write_toml_config(&config, &path).unwrap();

        let loaded = load_toml_config(Some(&path)).unwrap();
        assert_eq!(loaded.root_folder.as_deref(), Some("/data/fwip"));
        assert_eq!(loaded.bind_address.as_deref(), Some("127.0.0.1:6000"));
    }

    #[test]
    fn test_ensure_root_folder_creates_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested/fwip");
        let db_path = ensure_root_folder(&root).unwrap();
        assert!(root.is_dir());
        assert!(db_path.ends_with("fwip.db"));
    }
}
