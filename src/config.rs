//! Configuration management for the DTMF bridge

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub general: GeneralConfig,
    pub platform: PlatformConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Name of the method channel the plugin answers on
    pub channel: String,
    /// How long the server waits for running sequences after input closes
    pub drain_timeout_ms: u64,
}

/// Settings for the simulated platform backing the capability traits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    pub version: String,
    pub stream_max_volume: u32,
    pub initial_stream_volume: i32,
    /// `None` models a preference store that cannot be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtmf_tone_when_dialing: Option<bool>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            name: "Simulated".to_string(),
            version: "1.0".to_string(),
            stream_max_volume: 15,
            initial_stream_volume: 8,
            dtmf_tone_when_dialing: Some(true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "full")]
    Full,
}

impl BridgeConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&contents)
            .map_err(|e| Error::parse(format!("Invalid TOML: {}", e)))?;
        Ok(config)
    }

    pub fn load_from_env() -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default_config())?;

        // Environment variables with DTMF_ prefix override the defaults,
        // e.g. DTMF_PLATFORM__STREAM_MAX_VOLUME=7
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::Environment::with_prefix("DTMF")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let bridge_config = settings.try_deserialize()?;
        Ok(bridge_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.channel.trim().is_empty() {
            return Err(Error::parse("Channel name must not be empty"));
        }

        if self.platform.stream_max_volume == 0 {
            return Err(Error::parse("Stream max volume must be greater than zero"));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::parse(format!("Invalid log level: {}", other))),
        }

        Ok(())
    }

    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig {
                channel: "dtmf".to_string(),
                drain_timeout_ms: 5000,
            },
            platform: PlatformConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.channel, "dtmf");
        assert_eq!(config.platform.stream_max_volume, 15);
        assert_eq!(config.platform.dtmf_tone_when_dialing, Some(true));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = BridgeConfig::default_config();
        config.platform.stream_max_volume = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default_config();
        config.general.channel = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let toml_content = r#"
[general]
channel = "keypad"
drain_timeout_ms = 250

[platform]
name = "Bench"
version = "2.3"
stream_max_volume = 7
initial_stream_volume = 3

[logging]
level = "debug"
format = "compact"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = BridgeConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.general.channel, "keypad");
        assert_eq!(config.platform.stream_max_volume, 7);
        // An absent preference is read as "unreadable"
        assert_eq!(config.platform.dtmf_tone_when_dialing, None);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_load_from_file_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[general\nchannel = ").unwrap();

        let result = BridgeConfig::load_from_file(file.path());
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_generated_config_round_trips() {
        let config = BridgeConfig::default_config();
        let toml_content = toml::to_string_pretty(&config).unwrap();
        let parsed: BridgeConfig = toml::from_str(&toml_content).unwrap();
        assert_eq!(parsed.general.channel, config.general.channel);
        assert_eq!(parsed.platform.dtmf_tone_when_dialing, Some(true));
    }

    #[test]
    fn test_env_overrides_defaults() {
        std::env::set_var("DTMF_PLATFORM__STREAM_MAX_VOLUME", "7");
        std::env::set_var("DTMF_PLATFORM__DTMF_TONE_WHEN_DIALING", "false");

        let config = BridgeConfig::load_from_env();

        std::env::remove_var("DTMF_PLATFORM__STREAM_MAX_VOLUME");
        std::env::remove_var("DTMF_PLATFORM__DTMF_TONE_WHEN_DIALING");

        let config = config.unwrap();
        assert_eq!(config.platform.stream_max_volume, 7);
        assert_eq!(config.platform.dtmf_tone_when_dialing, Some(false));
        assert_eq!(config.general.channel, "dtmf");
        assert_eq!(config.platform.initial_stream_volume, 8);
    }
}
