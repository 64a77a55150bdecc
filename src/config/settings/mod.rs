
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_DATABASE_FILE: &str = "expenses.db";
pub const DEFAULT_CATEGORIES_FILE: &str = "categories.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub categories: CategoriesConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file, relative to the config directory unless absolute
    pub database_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CategoriesConfig {
    /// JSON file mapping category names to descriptions
    pub file: PathBuf,
    /// Reject expenses whose category is not in the category file
    pub strict: bool,
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_CATEGORIES_FILE),
            strict: true,
        }
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            categories: CategoriesConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid database file: path cannot be empty")]
    EmptyDatabaseFile,
    #[error("Invalid categories file: path cannot be empty")]
    EmptyCategoriesFile,
    #[error("Database file and categories file must differ: {0}")]
    ConflictingPaths(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default application directory, e.g. `~/.config/expense-mcp`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("expense-mcp"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Defaults rooted at `config_dir`, without touching the filesystem
    #[inline]
    pub fn with_base_dir<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            base_dir: config_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::with_base_dir(config_dir));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDatabaseFile);
        }

        if self.categories.file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCategoriesFile);
        }

        if self.storage.database_file == self.categories.file {
            return Err(ConfigError::ConflictingPaths(
                self.storage.database_file.display().to_string(),
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Get the path for the SQLite database
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.storage.database_file)
    }

    /// Get the path for the category file
    #[inline]
    pub fn categories_path(&self) -> PathBuf {
        self.resolve(&self.categories.file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.get_base_dir().join(path)
        }
    }
}
