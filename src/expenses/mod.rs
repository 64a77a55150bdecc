//! Expense Store
//!
//! The write boundary in front of the SQLite table. Writes are validated
//! against the category registry before their single query runs; reads pass
//! their filters straight through. Missing records come back as
//! [`ExpenseError::NotFound`] so callers can branch on it.

#[cfg(test)]
mod tests;

pub mod validation;

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::categories::CategoryRegistry;
use crate::database::{CategoryTotals, Database, Expense, ExpenseFilter, ExpenseUpdate, NewExpense};
use crate::{ExpenseError, Result};

#[derive(Debug, Clone)]
pub struct ExpenseStore {
    database: Arc<Database>,
    categories: Arc<CategoryRegistry>,
    strict_categories: bool,
}

fn storage_error(error: &anyhow::Error) -> ExpenseError {
    ExpenseError::Database(format!("{error:#}"))
}

impl ExpenseStore {
    #[inline]
    pub fn new(
        database: Arc<Database>,
        categories: Arc<CategoryRegistry>,
        strict_categories: bool,
    ) -> Self {
        Self {
            database,
            categories,
            strict_categories,
        }
    }

    #[inline]
    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict_categories
    }

    /// Record a new expense and return its id
    #[inline]
    pub async fn add_expense(&self, new_expense: &NewExpense) -> Result<i64> {
        validation::validate_new_expense(&self.categories, new_expense, self.strict_categories)?;

        if !self.strict_categories && !self.categories.contains(&new_expense.category) {
            warn!(
                "Recording expense with unregistered category '{}'",
                new_expense.category
            );
        }

        let id = self
            .database
            .add_expense(new_expense)
            .await
            .map_err(|e| storage_error(&e))?;

        info!(
            "Added expense {} ({} {} on {})",
            id, new_expense.amount, new_expense.category, new_expense.date
        );
        Ok(id)
    }

    /// Expenses matching `filter`, in id order
    ///
    /// Bounds compare as strings against the stored `YYYY-MM-DD` dates, so a
    /// prefix such as `2024-01` is a valid bound and an inverted range simply
    /// matches nothing.
    #[inline]
    pub async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let expenses = self
            .database
            .list_expenses(filter)
            .await
            .map_err(|e| storage_error(&e))?;

        debug!("Listed {} expenses for {:?}", expenses.len(), filter);
        Ok(expenses)
    }

    /// Change only the supplied fields of expense `id`
    #[inline]
    pub async fn edit_expense(&self, id: i64, update: &ExpenseUpdate) -> Result<Expense> {
        validation::validate_update(&self.categories, update, self.strict_categories)?;

        let updated = self
            .database
            .update_expense(id, update)
            .await
            .map_err(|e| storage_error(&e))?
            .ok_or(ExpenseError::NotFound { id })?;

        info!("Edited expense {}", id);
        Ok(updated)
    }

    #[inline]
    pub async fn delete_expense(&self, id: i64) -> Result<()> {
        let deleted = self
            .database
            .delete_expense(id)
            .await
            .map_err(|e| storage_error(&e))?;

        if !deleted {
            debug!("Nothing to delete for expense {}", id);
            return Err(ExpenseError::NotFound { id });
        }

        info!("Deleted expense {}", id);
        Ok(())
    }

    /// Total amount per category over the expenses matching `filter`
    #[inline]
    pub async fn summarize(&self, filter: &ExpenseFilter) -> Result<CategoryTotals> {
        self.database
            .summarize(filter)
            .await
            .map_err(|e| storage_error(&e))
    }

    #[inline]
    pub fn get_categories(&self) -> &BTreeMap<String, String> {
        self.categories.get_categories()
    }
}
