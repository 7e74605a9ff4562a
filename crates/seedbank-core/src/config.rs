use anyhow::{bail, Context, Result};
use seedbank_common::TimeZoneClock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SeedbankConfig {
    #[serde(default)]
    pub database: StorageConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir =
            dirs::data_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join("seedbank");

        Self {
            path: data_dir.join("seedbank.db").to_string_lossy().to_string(),
            max_connections: default_max_connections(),
        }
    }
}

impl StorageConfig {
    pub fn to_database_config(&self) -> seedbank_db::DatabaseConfig {
        seedbank_db::DatabaseConfig {
            path: self.path.clone(),
            max_connections: self.max_connections,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DefaultsConfig {
    /// Zone given to new families. Unset means the device zone.
    pub timezone: Option<String>,
    #[serde(default = "default_ledger_page_size")]
    pub ledger_page_size: i64,
}

fn default_ledger_page_size() -> i64 {
    50
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { timezone: None, ledger_page_size: default_ledger_page_size() }
    }
}

impl SeedbankConfig {
    /// Default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("seedbank")
            .join("seedbank.toml")
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        debug!("Loading seedbank configuration from {:?}", config_path);

        if !config_path.exists() {
            info!(
                "Configuration file not found at {:?}, creating default configuration",
                config_path
            );
            let default_config = Self::default();
            default_config.save_to_path(config_path)?;
            return Ok(default_config);
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: SeedbankConfig = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        info!("Loaded seedbank configuration from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        debug!("Saving seedbank configuration to {:?}", config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let config_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Saved seedbank configuration to {:?}", config_path);
        Ok(())
    }

    /// Validate the configuration settings
    pub fn validate(&self) -> Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create database directory: {:?}", parent))?;
        }

        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.defaults.ledger_page_size) {
            bail!("defaults.ledger_page_size must be between 1 and {}", MAX_PAGE_SIZE);
        }

        match &self.defaults.timezone {
            Some(zone) => {
                TimeZoneClock::resolve(zone)
                    .with_context(|| format!("Invalid defaults.timezone: {}", zone))?;
            }
            None => warn!("No default timezone configured - new families use the device zone"),
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("seedbank.toml");

        let config = SeedbankConfig::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, SeedbankConfig::default());
        assert_eq!(config.defaults.ledger_page_size, 50);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seedbank.toml");
        let db_path = dir.path().join("family.db");
        fs::write(
            &path,
            format!(
                "[database]\npath = {:?}\n\n[defaults]\ntimezone = \"Europe/Berlin\"\n",
                db_path.to_string_lossy()
            ),
        )
        .unwrap();

        let config = SeedbankConfig::load_from_path(&path).unwrap();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.defaults.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(EngineSettings::from(&config).timezone_or_device(), "Europe/Berlin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seedbank.toml");

        let mut config = SeedbankConfig::default();
        config.database.path = dir.path().join("db.sqlite").to_string_lossy().to_string();
        config.defaults.ledger_page_size = 20;
        config.save_to_path(&path).unwrap();

        assert_eq!(SeedbankConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = tempdir().unwrap();
        let mut config = SeedbankConfig::default();
        config.database.path = dir.path().join("db.sqlite").to_string_lossy().to_string();

        config.defaults.timezone = Some("Moon/Tranquility".to_string());
        assert!(config.validate().is_err());

        config.defaults.timezone = Some("UTC".to_string());
        config.defaults.ledger_page_size = 0;
        assert!(config.validate().is_err());

        config.defaults.ledger_page_size = 50;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
