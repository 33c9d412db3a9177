//! Configuration file handling for attendant.
//!
//! Loads configuration from `~/.config/attendant/config.toml` or a custom
//! path passed via `--config`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::{API_URL_ENV, DEFAULT_API_BASE_URL};
use crate::capture::{CaptureSettings, Resolution};

/// Configuration file structure for attendant.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiConfig {
    /// Backend base URL, e.g. "https://attendance.example.edu"
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    /// Resolution as "WIDTHxHEIGHT" (default 1280x720)
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            resolution: None,
            fps: default_fps(),
        }
    }
}

fn default_fps() -> u32 {
    30
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Resolve the backend base URL: env var > config file > built-in default.
    pub fn api_base_url(&self) -> String {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                return url;
            }
        }
        self.api
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Build capture settings from the camera section.
    ///
    /// An explicit device index (from `--camera`) overrides the config file.
    pub fn capture_settings(
        &self,
        device_override: Option<u32>,
    ) -> Result<CaptureSettings, ConfigError> {
        let resolution = match self.camera.resolution.as_deref() {
            Some(s) => parse_resolution(s).map_err(|reason| ConfigError::Invalid {
                field: "camera.resolution",
                reason,
            })?,
            None => Resolution::default(),
        };

        Ok(CaptureSettings {
            device_index: device_override.unwrap_or(self.camera.device),
            resolution,
            fps: self.camera.fps,
        })
    }
}

/// Parse a resolution in WIDTHxHEIGHT format.
fn parse_resolution(s: &str) -> Result<Resolution, String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid resolution format '{}'. Use WIDTHxHEIGHT (e.g., 1280x720)",
            s
        ));
    }

    let width: u32 = parts[0]
        .parse()
        .map_err(|_| format!("Invalid width '{}'", parts[0]))?;
    let height: u32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid height '{}'", parts[1]))?;

    if width == 0 || height == 0 {
        return Err("Resolution dimensions must be non-zero".to_string());
    }

    Ok(Resolution { width, height })
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("attendant")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert!(config.api.base_url.is_none());
        assert_eq!(config.camera.device, 0);
        assert_eq!(config.camera.fps, 30);
    }

    #[test]
    fn test_load_parses_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://attendance.example.edu"

[camera]
device = 1
resolution = "640x480"
fps = 15
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(
            config.api.base_url.as_deref(),
            Some("https://attendance.example.edu")
        );
        assert_eq!(config.camera.device, 1);
        assert_eq!(config.camera.resolution.as_deref(), Some("640x480"));
        assert_eq!(config.camera.fps, 15);
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();

        let result = Config::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_capture_settings_defaults() {
        let config = Config::default();
        let settings = config.capture_settings(None).unwrap();
        assert_eq!(settings.device_index, 0);
        assert_eq!(settings.resolution, Resolution::HIGH);
        assert_eq!(settings.fps, 30);
    }

    #[test]
    fn test_capture_settings_device_override() {
        let config = Config::default();
        let settings = config.capture_settings(Some(2)).unwrap();
        assert_eq!(settings.device_index, 2);
    }

    #[test]
    fn test_capture_settings_invalid_resolution() {
        let config = Config {
            camera: CameraConfig {
                resolution: Some("widexhigh".to_string()),
                ..CameraConfig::default()
            },
            ..Config::default()
        };
        let result = config.capture_settings(None);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_parse_resolution_valid() {
        let res = parse_resolution("1280x720").unwrap();
        assert_eq!(res.width, 1280);
        assert_eq!(res.height, 720);
    }

    #[test]
    fn test_parse_resolution_rejects_bad_formats() {
        assert!(parse_resolution("1280").is_err());
        assert!(parse_resolution("1280x720x60").is_err());
        assert!(parse_resolution("axb").is_err());
        assert!(parse_resolution("0x720").is_err());
    }

    #[test]
    fn test_api_base_url_config_fallback() {
        // Guard against env leakage from other tests
        std::env::remove_var(API_URL_ENV);

        let config = Config {
            api: ApiConfig {
                base_url: Some("https://cfg.example".to_string()),
            },
            ..Config::default()
        };
        assert_eq!(config.api_base_url(), "https://cfg.example");

        let default_config = Config::default();
        assert_eq!(default_config.api_base_url(), DEFAULT_API_BASE_URL);
    }
}
