use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

/// Default observation window in seconds.
pub const DEFAULT_OBSERVE_SECS: u64 = 10;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Observation window length in seconds (overridden by `--secs`).
    pub observe_secs: u64,
    /// Custom preference file path (overrides XDG default).
    pub prefs_path: Option<PathBuf>,
    /// YouTube Data API settings.
    pub youtube: YouTubeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            observe_secs: DEFAULT_OBSERVE_SECS,
            prefs_path: None,
            youtube: YouTubeConfig::default(),
        }
    }
}

/// YouTube Data API configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// API key; search commands refuse to run without one.
    pub api_key: Option<String>,
    /// Rate limit between per-term API requests in milliseconds.
    pub rate_limit_ms: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            rate_limit_ms: 200,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/moodtune/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => {
                        match toml::from_str::<AppConfig>(&contents) {
                            Ok(config) => {
                                log::info!("Loaded config from {}", path.display());
                                config
                            }
                            Err(e) => {
                                log::warn!(
                                    "Failed to parse {}: {}. Using defaults.",
                                    path.display(),
                                    e
                                );
                                Self::default()
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!(
                            "Failed to read {}: {}. Using defaults.",
                            path.display(),
                            e
                        );
                        Self::default()
                    }
                }
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
