use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::osc::destination::validate_address;
use crate::timecode::{parse_offset, Framerate, MAX_SPEED_PERCENT};
use crate::messages::{Settings, MAX_TICK_RATE_HZ};

/// Configuration manager for tcgen settings
/// Separates the schema of available options from the persisted values.
/// Settings are only read from and written to disk when a path is in use;
/// defaults to 'tcgen.json' in the current working directory
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub output: OutputConfigSchema,
    pub timecode: TimecodeConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfigSchema {
    pub host: ConfigOption<String>,
    pub port: ConfigOption<u16>,
    pub osc_address: ConfigOption<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimecodeConfigSchema {
    pub framerate: ConfigOption<Framerate>,
    pub speed_percent: ConfigOption<u16>,
    pub start_offset: ConfigOption<String>,
    pub tick_rate_hz: ConfigOption<u32>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'tcgen.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("tcgen.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from configuration file
    /// Writes the defaults if the file doesn't exist yet
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let created_at = self.existing_created_at().unwrap_or_else(|| now.clone());

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at,
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        log::info!("Saved settings to {}", self.config_path.display());
        Ok(())
    }

    fn existing_created_at(&self) -> Option<String> {
        let content = fs::read_to_string(&self.config_path).ok()?;
        let config_file: ConfigFile = serde_json::from_str(&content).ok()?;
        Some(config_file.created_at)
    }

    /// Validate, then update settings and save to file
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        let defaults = Settings::default();
        ConfigSchema {
            output: OutputConfigSchema {
                host: ConfigOption {
                    default: defaults.host,
                    valid_range: None,
                    valid_choices: None,
                    description: "Host name or IP address of the OSC receiver".to_string(),
                },
                port: ConfigOption {
                    default: defaults.port,
                    valid_range: Some((1, 65535)),
                    valid_choices: None,
                    description: "UDP port of the OSC receiver".to_string(),
                },
                osc_address: ConfigOption {
                    default: defaults.osc_address,
                    valid_range: None,
                    valid_choices: None,
                    description: "OSC address the timecode string is sent to".to_string(),
                },
            },
            timecode: TimecodeConfigSchema {
                framerate: ConfigOption {
                    default: defaults.framerate,
                    valid_range: None,
                    valid_choices: Some(Framerate::ALL.to_vec()),
                    description: "Timecode framerate (29.97 uses drop-frame numbering)"
                        .to_string(),
                },
                speed_percent: ConfigOption {
                    default: defaults.speed_percent,
                    valid_range: Some((0, MAX_SPEED_PERCENT)),
                    valid_choices: None,
                    description: "Playback speed as a percentage of real time".to_string(),
                },
                start_offset: ConfigOption {
                    default: defaults.start_offset,
                    valid_range: None,
                    valid_choices: None,
                    description: "Timecode (HH:MM:SS:FF) applied on reset".to_string(),
                },
                tick_rate_hz: ConfigOption {
                    default: defaults.tick_rate_hz,
                    valid_range: Some((0, MAX_TICK_RATE_HZ)),
                    valid_choices: None,
                    description: "Messages sent per second; 0 sends once per frame".to_string(),
                },
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        // Output settings
        if settings.host.trim().is_empty() {
            errors.push("host must not be empty".to_string());
        }

        if let Some((min, max)) = schema.output.port.valid_range {
            if settings.port < min || settings.port > max {
                errors.push(format!("port must be between {} and {}", min, max));
            }
        }

        if let Err(e) = validate_address(&settings.osc_address) {
            errors.push(e.to_string());
        }

        // Timecode settings
        if let Some(choices) = &schema.timecode.framerate.valid_choices {
            if !choices.contains(&settings.framerate) {
                errors.push(format!("framerate must be one of: {:?}", choices));
            }
        }

        if let Some((min, max)) = schema.timecode.speed_percent.valid_range {
            if settings.speed_percent < min || settings.speed_percent > max {
                errors.push(format!("speed_percent must be between {} and {}", min, max));
            }
        }

        if let Err(e) = parse_offset(&settings.start_offset, settings.framerate) {
            errors.push(format!("start_offset: {}", e));
        }

        if let Some((min, max)) = schema.timecode.tick_rate_hz.valid_range {
            if settings.tick_rate_hz < min || settings.tick_rate_hz > max {
                errors.push(format!("tick_rate_hz must be between {} and {}", min, max));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Failed to parse config file: {0}")]
    ParseError(String),
    #[error("Failed to serialize config: {0}")]
    SerializeError(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    ValidationError(Vec<String>),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("tcgen.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let settings = manager.load().unwrap();

        assert_eq!(settings, Settings::default());
        assert!(config_path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let settings = Settings {
            host: "10.0.0.20".to_string(),
            port: 53000,
            osc_address: "/show/timecode".to_string(),
            framerate: Framerate::Fps29_97Drop,
            speed_percent: 150,
            start_offset: "01:00:00;00".to_string(),
            tick_rate_hz: 60,
        };
        manager.update_settings(settings.clone()).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("\"framerate\": \"29.97\""));

        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded_settings = manager2.load().unwrap();
        assert_eq!(loaded_settings, settings);
    }

    #[test]
    fn test_created_at_survives_resave() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        manager.save().unwrap();
        let first: ConfigFile =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();

        manager.reset_to_defaults().unwrap();
        let second: ConfigFile =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        assert!(matches!(manager.load(), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_update_rejects_invalid_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");
        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let settings = Settings {
            speed_percent: 500,
            ..Settings::default()
        };
        assert!(matches!(
            manager.update_settings(settings),
            Err(ConfigError::ValidationError(_))
        ));
        assert_eq!(manager.settings(), &Settings::default());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.port = 0;
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.port = 9001;
        settings.osc_address = "timecode".to_string();
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.osc_address = "/timecode".to_string();
        settings.speed_percent = 201;
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.speed_percent = 0;
        settings.framerate = Framerate::Fps25;
        settings.start_offset = "00:00:00:27".to_string();
        let errors = ConfigManager::validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("start_offset"));

        settings.start_offset = "00:00:00:24".to_string();
        settings.tick_rate_hz = 1000;
        assert!(ConfigManager::validate_settings(&settings).is_err());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let settings = Settings {
            host: String::new(),
            port: 0,
            osc_address: String::new(),
            speed_percent: 300,
            ..Settings::default()
        };
        let errors = ConfigManager::validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);

        let message = ConfigError::ValidationError(errors).to_string();
        assert!(message.starts_with("Config validation errors: "));
        assert!(message.contains("host must not be empty, port must be between"));
    }

    #[test]
    fn test_schema_completeness() {
        let schema = ConfigManager::schema();

        assert_eq!(schema.output.port.default, 9001);
        assert!(!schema.output.host.description.is_empty());
        assert_eq!(
            schema.timecode.framerate.valid_choices.as_ref().map(Vec::len),
            Some(5)
        );
        assert!(schema.timecode.speed_percent.valid_range.is_some());
        assert!(schema.timecode.tick_rate_hz.valid_range.is_some());
    }
}
