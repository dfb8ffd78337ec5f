//! Configuration system for Strata
//!
//! Loads configuration from TOML file at `~/.config/strata/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub desktops: DesktopsConfig,
    pub focus: FocusConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = Self::from_toml_str(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse and normalise a configuration document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.normalize();
        Ok(config)
    }

    /// Replace out-of-range values with usable ones
    fn normalize(&mut self) {
        if self.desktops.count == 0 {
            warn!("desktops.count = 0 is invalid, using 1");
            self.desktops.count = 1;
        }
        let count = self.desktops.count as usize;
        if self.desktops.names.len() > count {
            warn!(
                "{} desktop names for {} desktops, dropping the rest",
                self.desktops.names.len(),
                count
            );
            self.desktops.names.truncate(count);
        }
        if self.logging.filter.trim().is_empty() {
            warn!("Empty logging.filter, using default");
            self.logging.filter = LoggingConfig::default().filter;
        }
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("strata");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// EWMH compatibility bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,
    /// X display to connect to; `$DISPLAY` when unset
    pub display: Option<String>,
    /// Take over from a running window manager
    pub replace: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            display: None,
            replace: false,
        }
    }
}

/// Virtual desktops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopsConfig {
    pub count: u32,
    pub names: Vec<String>,
}

impl Default for DesktopsConfig {
    fn default() -> Self {
        Self {
            count: 4,
            names: (1..=4).map(|i| i.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Raise clients when they are activated
    pub raise_on_focus: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            raise_on_focus: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "strata=debug,info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml_str("[focus]\nraise_on_focus = false\n").unwrap();
        assert!(!config.focus.raise_on_focus);
        assert!(config.bridge.enabled);
        assert_eq!(config.desktops.count, 4);
        assert_eq!(config.logging.filter, "strata=debug,info");
    }

    #[test]
    fn test_invalid_values_are_normalised() {
        let config = Config::from_toml_str(
            "[desktops]\ncount = 0\nnames = [\"a\", \"b\"]\n\n[logging]\nfilter = \"\"\n",
        )
        .unwrap();
        assert_eq!(config.desktops.count, 1);
        assert_eq!(config.desktops.names, vec!["a".to_string()]);
        assert_eq!(config.logging.filter, "strata=debug,info");
    }

    #[test]
    fn test_default_serializes_and_parses_back() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config = Config::from_toml_str(&text).unwrap();
        assert_eq!(config.desktops.names.len(), 4);
        assert!(config.bridge.display.is_none());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(Config::from_toml_str("[desktops\ncount = 2").is_err());
    }
}
