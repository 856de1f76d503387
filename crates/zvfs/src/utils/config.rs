//! Application configuration management utilities.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;

/// Application-wide configuration stored in config.toml.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Mount profile used when neither `--profile` nor `--archive` is given.
    pub default_profile: Option<Utf8PathBuf>,
    /// Verify entry checksums on extraction unless a profile says otherwise.
    pub verify_checksums: bool,
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (config.toml next to the executable).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("config.toml"))
}

/// Parses a configuration document, falling back to defaults on syntax errors.
pub fn parse_config(content: &str) -> AppConfig {
    match toml::from_str(content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Ignoring malformed config.toml: {}", e);
            AppConfig::default()
        }
    }
}

/// Loads the application configuration from config.toml.
/// Returns default configuration if the file doesn't exist or cannot be parsed.
pub fn load_config() -> AppConfig {
    let Some(path) = default_config_path() else {
        return AppConfig::default();
    };

    match fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(_) => AppConfig::default(),
    }
}

/// Saves the application configuration to config.toml.
pub fn save_config(cfg: &AppConfig) -> io::Result<()> {
    if let Some(path) = default_config_path() {
        let content = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
        fs::write(path, content)
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine config path",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let cfg = parse_config(
            r#"
default_profile = "profiles/gothic2.toml"
verify_checksums = true
"#,
        );
        assert_eq!(
            cfg.default_profile,
            Some(Utf8PathBuf::from("profiles/gothic2.toml"))
        );
        assert!(cfg.verify_checksums);
    }

    #[test]
    fn missing_keys_use_defaults() {
        assert_eq!(parse_config(""), AppConfig::default());
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        assert_eq!(parse_config("verify_checksums = ["), AppConfig::default());
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let cfg = AppConfig {
            default_profile: Some(Utf8PathBuf::from("mods.toml")),
            verify_checksums: true,
        };
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(parse_config(&text), cfg);
    }
}
