use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub use crate::database::sqlite::models::{
    CategoryTotals, Expense, ExpenseFilter, ExpenseUpdate, NewExpense,
};
use crate::database::sqlite::queries::ExpenseQueries;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        // WAL plus a busy timeout lets SQLite serialize concurrent writers
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Open the database at `db_path`, creating its parent directory first
    #[inline]
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        Self::new(db_path).await
    }

    #[inline]
    pub async fn add_expense(&self, new_expense: &NewExpense) -> Result<i64> {
        ExpenseQueries::create(&self.pool, new_expense).await
    }

    #[inline]
    pub async fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        ExpenseQueries::get_by_id(&self.pool, id).await
    }

    #[inline]
    pub async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        ExpenseQueries::list(&self.pool, filter).await
    }

    #[inline]
    pub async fn update_expense(&self, id: i64, update: &ExpenseUpdate) -> Result<Option<Expense>> {
        ExpenseQueries::update(&self.pool, id, update).await
    }

    #[inline]
    pub async fn delete_expense(&self, id: i64) -> Result<bool> {
        ExpenseQueries::delete(&self.pool, id).await
    }

    #[inline]
    pub async fn summarize(&self, filter: &ExpenseFilter) -> Result<CategoryTotals> {
        ExpenseQueries::summarize(&self.pool, filter).await
    }

    #[inline]
    pub async fn count_expenses(&self) -> Result<i64> {
        ExpenseQueries::count(&self.pool).await
    }
}
