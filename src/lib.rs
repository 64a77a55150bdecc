use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExpenseError>;

#[derive(Error, Debug)]
pub enum ExpenseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Expense not found: {id}")]
    NotFound { id: i64 },

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ExpenseError {
    /// Stable machine-readable tag reported to MCP clients
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "invalid_input",
            Self::Database(_) | Self::Io(_) => "storage_error",
            Self::Config(_) => "config_error",
            Self::Mcp(_) | Self::Other(_) => "internal_error",
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub mod categories;
pub mod commands;
pub mod config;
pub mod database;
pub mod expenses;
pub mod mcp;
