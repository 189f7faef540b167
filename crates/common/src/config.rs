//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Encoder process settings.
    pub encoder: EncoderDefaults,

    /// Default render parameters.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Encoder process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderDefaults {
    /// Encoder executable, resolved through `PATH`.
    pub program: String,

    /// Arguments placed before the generated ones, for launchers such as `nice`.
    pub program_args: Vec<String>,

    /// Arguments inserted before per-request extra arguments.
    pub extra_args: Vec<String>,

    /// How many trailing bytes of encoder stderr to keep for error reports.
    pub capture_stderr_bytes: usize,
}

/// Render backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackendKind {
    Software,
    Gpu,
}

/// Default render parameters, overridable per export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    pub backend: RenderBackendKind,

    /// Multisample count (0 or 1 disables multisampling).
    pub sample_count: u32,

    pub width: u32,
    pub height: u32,

    /// Framerate as `num/den` or a plain integer.
    pub framerate: String,

    /// Row order delivered to the encoder: `top-down` or `bottom-up`.
    pub row_order: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framepipe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for EncoderDefaults {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            program_args: Vec::new(),
            extra_args: Vec::new(),
            capture_stderr_bytes: 8192,
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            backend: RenderBackendKind::Software,
            sample_count: 4,
            width: 1280,
            height: 720,
            framerate: "60/1".to_string(),
            row_order: "top-down".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framepipe").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("framepipe_test_config_missing/config.json");
        let _ = std::fs::remove_file(&path);
        let config = AppConfig::load_from(&path);
        assert_eq!(config.encoder.program, "ffmpeg");
        assert_eq!(config.render.backend, RenderBackendKind::Software);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = std::env::temp_dir().join("framepipe_test_config_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"encoder":{"program":"/usr/local/bin/ffmpeg"}}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.encoder.program, "/usr/local/bin/ffmpeg");
        assert_eq!(config.encoder.capture_stderr_bytes, 8192);
        assert_eq!(config.render.framerate, "60/1");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join("framepipe_test_config_save");
        let path = dir.join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.render.backend = RenderBackendKind::Gpu;
        config.render.sample_count = 8;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.render.backend, RenderBackendKind::Gpu);
        assert_eq!(loaded.render.sample_count, 8);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let dir = std::env::temp_dir().join("framepipe_test_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.logging.level, "info");

        std::fs::remove_dir_all(&dir).ok();
    }
}
