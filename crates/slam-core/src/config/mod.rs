//! Configuration and well-known locations.
//!
//! This module contains:
//! - `Config` - user settings loaded from a TOML file
//! - `InstallLocator` implementations that find the Steam install directory
//! - Path, registry and callback pump constants

mod locator;

pub use locator::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Paths and names inside the Steam installation.
pub mod paths {
    /// Registry keys holding `InstallPath`, checked in order.
    pub const REGISTRY_KEYS: [&str; 2] = [
        r"Software\Valve\Steam",
        r"Software\Wow6432Node\Valve\Steam",
    ];

    /// Registry value holding the install directory.
    pub const REGISTRY_VALUE: &str = "InstallPath";

    /// Environment variable overriding install discovery.
    pub const INSTALL_PATH_ENV: &str = "SLAM_STEAM_PATH";

    /// Environment variable the client library reads to identify the app.
    pub const APP_ID_ENV: &str = "SteamAppId";

    /// Directory holding per-app achievement schemas, relative to the install.
    pub const STATS_DIR: [&str; 2] = ["appcache", "stats"];

    /// Global app catalog, relative to the install.
    pub const APP_INFO: [&str; 2] = ["appcache", "appinfo.vdf"];

    /// Location of the client library relative to the install directory.
    pub const fn library_relative_path() -> &'static str {
        if cfg!(all(target_os = "windows", target_pointer_width = "64")) {
            "steamclient64.dll"
        } else if cfg!(target_os = "windows") {
            "steamclient.dll"
        } else if cfg!(target_pointer_width = "64") {
            "linux64/steamclient.so"
        } else {
            "linux32/steamclient.so"
        }
    }
}

/// Callback pump cadence.
pub mod callbacks {
    use std::time::Duration;

    /// Default delay between two callback pumps.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Default time to wait for an asynchronous stats reply.
    pub const STATS_TIMEOUT: Duration = Duration::from_secs(10);
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Steam install directory; discovered automatically when unset.
    pub steam_path: Option<PathBuf>,
    /// Language used for schema strings; Steam's current language when unset.
    pub language: Option<String>,
    /// Delay between callback pumps in milliseconds.
    pub callback_interval_ms: u64,
    /// How long to wait for the stats reply, in seconds.
    pub stats_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steam_path: None,
            language: None,
            callback_interval_ms: callbacks::POLL_INTERVAL.as_millis() as u64,
            stats_timeout_secs: callbacks::STATS_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load config, falling back to defaults when the file is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(Error::FileNotFound(missing)) => {
                warn!("Config file {} not found, using defaults", missing.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParseError(e.to_string()))
    }

    pub fn callback_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.callback_interval_ms)
    }

    pub fn stats_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.stats_timeout_secs)
    }

    /// Locator honoring `steam_path` before automatic discovery.
    pub fn locator(&self) -> SteamInstall {
        SteamInstall::new(self.steam_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.steam_path, None);
        assert_eq!(config.callback_interval().as_millis(), 100);
        assert_eq!(config.stats_timeout().as_secs(), 10);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = Config::parse(
            r#"
            steam_path = "D:/Games/Steam"
            language = "german"
            "#,
        )
        .unwrap();

        assert_eq!(config.steam_path, Some(PathBuf::from("D:/Games/Steam")));
        assert_eq!(config.language.as_deref(), Some("german"));
        assert_eq!(config.callback_interval_ms, 100);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("callback_interval_ms = \"fast\"");
        assert!(matches!(result, Err(Error::ConfigParseError(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("slam.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slam.toml");
        std::fs::write(&path, "stats_timeout_secs = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.stats_timeout_secs, 3);
    }

    #[test]
    fn test_library_relative_path_is_not_empty() {
        assert!(paths::library_relative_path().contains("steamclient"));
    }
}
