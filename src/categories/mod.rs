//! Category Registry
//!
//! The set of allowed expense categories, loaded once from a JSON object of
//! `name -> description` pairs and shared read-only afterwards.


use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Category file written by `expense-mcp init`
pub const DEFAULT_CATEGORIES: &str = include_str!("default_categories.json");

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Failed to read category file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse category file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Category file defines no categories")]
    Empty,
    #[error("Category name cannot be blank")]
    BlankName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: BTreeMap<String, String>,
}

impl CategoryRegistry {
    /// Load the registry from a JSON category file
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CategoryError> {
        let path = path.as_ref();
        debug!("Loading categories from {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| CategoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let categories: BTreeMap<String, String> =
            serde_json::from_str(&content).map_err(|source| CategoryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let registry = Self::from_map(categories)?;
        info!(
            "Loaded {} categories from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Build a registry from an in-memory mapping
    #[inline]
    pub fn from_map(categories: BTreeMap<String, String>) -> Result<Self, CategoryError> {
        if categories.is_empty() {
            return Err(CategoryError::Empty);
        }

        if categories.keys().any(|name| name.trim().is_empty()) {
            return Err(CategoryError::BlankName);
        }

        Ok(Self { categories })
    }

    /// Full mapping of category name to description
    #[inline]
    pub fn get_categories(&self) -> &BTreeMap<String, String> {
        &self.categories
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    #[inline]
    pub fn description(&self, name: &str) -> Option<&str> {
        self.categories.get(name).map(String::as_str)
    }

    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Serialize as the JSON object served to MCP clients
    #[inline]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.categories
                .iter()
                .map(|(name, description)| {
                    (name.clone(), serde_json::Value::String(description.clone()))
                })
                .collect(),
        )
    }
}
