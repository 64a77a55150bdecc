// Configuration management module
// Handles the TOML settings file and the printable view of it

pub mod display;
pub mod settings;

pub use display::show_config;
pub use settings::{CategoriesConfig, Config, ConfigError, StorageConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
