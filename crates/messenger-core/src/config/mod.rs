//! Configuration management with file persistence

use crate::storage::{DatabaseConfig, default_database_path, parse_journal_mode};
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "MESSENGER_CONFIG_DIR";

/// Environment variable overriding the database path
pub const DATABASE_ENV: &str = "MESSENGER_DATABASE";

const JOURNAL_MODES: [&str; 6] = ["delete", "truncate", "persist", "memory", "wal", "off"];
const OUTPUT_FORMATS: [&str; 2] = ["text", "json"];

/// Messenger configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file; the platform data directory is used when unset
    pub path: Option<PathBuf>,
    pub enforce_foreign_keys: bool,
    pub journal_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            enforce_foreign_keys: false,
            journal_mode: "wal".to_string(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Resolve the database path: explicit override, then `MESSENGER_DATABASE`,
    /// then the configured path, then the platform default
    pub fn resolved_path(&self, override_path: Option<&Path>) -> PathBuf {
        if let Some(path) = override_path {
            return path.to_path_buf();
        }
        if let Some(path) = env::var_os(DATABASE_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        self.path.clone().unwrap_or_else(default_database_path)
    }

    /// Build the connection settings for the storage layer
    pub fn to_database_config(&self, override_path: Option<&Path>) -> anyhow::Result<DatabaseConfig> {
        let journal_mode = parse_journal_mode(&self.journal_mode)
            .ok_or_else(|| anyhow!("Invalid journal mode: {}", self.journal_mode))?;

        Ok(DatabaseConfig::with_path(self.resolved_path(override_path))
            .enforce_foreign_keys(self.enforce_foreign_keys)
            .journal_mode(journal_mode))
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("messenger")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if parse_journal_mode(&self.database.journal_mode).is_none() {
            return Err(anyhow!(
                "Invalid journal mode: {}. Valid options: {}",
                self.database.journal_mode,
                JOURNAL_MODES.join(", ")
            ));
        }
        if !OUTPUT_FORMATS.contains(&self.output.format.as_str()) {
            return Err(anyhow!(
                "Invalid output format: {}. Valid options: {}",
                self.output.format,
                OUTPUT_FORMATS.join(", ")
            ));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(self
                .database
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("(default: {})", default_database_path().display()))),
            "database.enforce_foreign_keys" => Ok(self.database.enforce_foreign_keys.to_string()),
            "database.journal_mode" => Ok(self.database.journal_mode.clone()),
            "output.format" => Ok(self.output.format.clone()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `messenger config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                self.database.path = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "database.enforce_foreign_keys" => {
                self.database.enforce_foreign_keys = value
                    .parse()
                    .with_context(|| format!("Invalid enforce_foreign_keys value: {}", value))?;
            }
            "database.journal_mode" => {
                let mode = value.to_ascii_lowercase();
                if parse_journal_mode(&mode).is_none() {
                    return Err(anyhow!(
                        "Invalid journal mode: {}. Valid options: {}",
                        value,
                        JOURNAL_MODES.join(", ")
                    ));
                }
                self.database.journal_mode = mode;
            }
            "output.format" => {
                if !OUTPUT_FORMATS.contains(&value) {
                    return Err(anyhow!(
                        "Invalid output format: {}. Valid options: {}",
                        value,
                        OUTPUT_FORMATS.join(", ")
                    ));
                }
                self.output.format = value.to_string();
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `messenger config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "database.path",
            "database.enforce_foreign_keys",
            "database.journal_mode",
            "output.format",
        ];

        keys.into_iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.database.path.is_none());
        assert!(!config.database.enforce_foreign_keys);
        assert_eq!(config.database.journal_mode, "wal");
        assert_eq!(config.output.format, "text");
        config.validate().unwrap();
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut config = Config::default();

        config.set("database.path", "/tmp/chat.db").unwrap();
        config.set("database.enforce_foreign_keys", "true").unwrap();
        config.set("database.journal_mode", "DELETE").unwrap();
        config.set("output.format", "json").unwrap();

        assert_eq!(config.get("database.path").unwrap(), "/tmp/chat.db");
        assert_eq!(config.get("database.enforce_foreign_keys").unwrap(), "true");
        assert_eq!(config.get("database.journal_mode").unwrap(), "delete");
        assert_eq!(config.get("output.format").unwrap(), "json");

        config.set("database.path", "").unwrap();
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();

        assert!(config.set("database.journal_mode", "sideways").is_err());
        assert!(config.set("database.enforce_foreign_keys", "maybe").is_err());
        assert!(config.set("output.format", "xml").is_err());
        assert!(config.set("nope", "1").is_err());
        assert!(config.get("nope").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_list_contains_all_keys() {
        let keys: Vec<_> = Config::default()
            .list()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            vec![
                "database.path",
                "database.enforce_foreign_keys",
                "database.journal_mode",
                "output.format"
            ]
        );
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("database.path", "/var/lib/messenger/chat.db").unwrap();
        config.set("output.format", "json").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[output]\nformat = \"json\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.output.format, "json");
        assert_eq!(loaded.database, DatabaseSettings::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[database]\njournal_mode = \"sideways\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_to_database_config_prefers_override() {
        let settings = DatabaseSettings {
            path: Some(PathBuf::from("/configured.db")),
            enforce_foreign_keys: true,
            ..Default::default()
        };

        let config = settings
            .to_database_config(Some(Path::new("/override.db")))
            .unwrap();
        assert_eq!(config.path, PathBuf::from("/override.db"));
        assert!(config.enforce_foreign_keys);
    }
}
