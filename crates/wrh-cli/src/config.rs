//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Demo metadata (JSON Lines) used when `--demos` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demos_path: Option<PathBuf>,

    /// Keep lookups and unattributed observed records in the history.
    #[serde(default)]
    pub include_all: bool,
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WRH_*)
        figment = figment.merge(Env::prefixed("WRH_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for wrh.
///
/// On Linux: `~/.config/wrh`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wrh"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_dirs_config_path_ends_with_wrh() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "wrh");
    }

    #[test]
    fn test_default_config_excludes_inferred_rows() {
        let config = Config::default();
        assert!(!config.include_all);
        assert!(config.demos_path.is_none());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "include_all = true").unwrap();
        writeln!(file, "demos_path = \"/data/demos.jsonl\"").unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();

        assert!(config.include_all);
        assert_eq!(config.demos_path, Some(PathBuf::from("/data/demos.jsonl")));
    }
}
