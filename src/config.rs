use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const CONFIG_FILE: &str = "macreg.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Portal base URL; endpoint paths are relative to it.
    pub base_url: String,
    /// Where the session token is cached between runs.
    pub token_path: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token_path: default_token_path(),
            log_level: "info".to_string(),
        }
    }
}

fn default_token_path() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".macreg-session")
}

impl Config {
    /// Optional `macreg.toml` in the working directory, then environment
    /// overrides, then defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;

        if let Ok(url) = env::var("MACREG_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = env::var("MACREG_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }
        if let Ok(level) = env::var("MACREG_LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    // An absent file means "all defaults"; any other read failure is a
    // real error and must not be mistaken for one.
    fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).context("invalid macreg.toml"),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).context("failed to read macreg.toml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let config: Config = toml::from_str("base_url = \"https://macreg.example.com\"").unwrap();
        assert_eq!(config.base_url, "https://macreg.example.com");
        assert_eq!(config.log_level, "info");
        assert!(config.token_path.ends_with(".macreg-session"));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("macreg.toml")).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn unreadable_file_is_an_error_not_a_default() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the config path fails to read, but not with
        // NotFound; that must surface instead of yielding defaults.
        assert!(Config::load_from(dir.path()).is_err());
    }
}
