use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use ticklist_core::view::Filter;

/// User-level configuration loaded from `~/.config/ticklist/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Override for the data directory.
    pub data_dir: Option<PathBuf>,
    pub storage: StorageConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Encrypt task data at rest (key from `TICKLIST_DATA_KEY` or the OS keyring).
    pub encrypt: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    /// Filter applied when a session starts.
    pub default_filter: Filter,
    /// How long status messages stay on screen.
    pub toast_millis: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_filter: Filter::All,
            toast_millis: 2_000,
        }
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("ticklist").join("config.toml"))
}

/// Write `config` to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    let path = default_path()?;
    write_if_missing(config, &path)?;
    Ok(path)
}

/// Returns whether a file was written; existing files are left untouched.
fn write_if_missing(config: &Config, path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, Config::default());
        assert!(!cfg.storage.encrypt);
        assert_eq!(cfg.ui.toast_millis, 2_000);
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            data_dir = "/tmp/ticklist-data"
            [storage]
            encrypt = true
            [ui]
            default_filter = "pending"
            toast_millis = 500
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(
            cfg,
            Config {
                data_dir: Some(PathBuf::from("/tmp/ticklist-data")),
                storage: StorageConfig { encrypt: true },
                ui: UiConfig {
                    default_filter: Filter::Pending,
                    toast_millis: 500,
                },
            }
        );
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ui]\ndefault_filter = \"completed\"\n").expect("write");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(cfg.ui.default_filter, Filter::Completed);
        assert_eq!(cfg.ui.toast_millis, 2_000);
        assert_eq!(cfg.data_dir, None);
    }

    #[test]
    fn rejects_unknown_filter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ui]\ndefault_filter = \"archived\"\n").expect("write");

        assert!(load_from_path(&path).is_err());
    }

    #[test]
    fn write_default_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            data_dir: Some(PathBuf::from("/tmp/ticklist-data")),
            ..Config::default()
        };

        assert!(write_if_missing(&cfg, &path).expect("write should succeed"));
        assert!(!write_if_missing(&Config::default(), &path).expect("second write ok"));
        assert_eq!(load_from_path(&path).expect("load"), cfg);
    }
}
