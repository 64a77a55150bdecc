#[cfg(test)]
mod tests;

use super::models::*;
use anyhow::{Context, Result};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

const EXPENSE_COLUMNS: &str = "SELECT id, date, amount, category, subcategory, note FROM expenses";
const EXPENSE_BY_ID: &str =
    "SELECT id, date, amount, category, subcategory, note FROM expenses WHERE id = ?";

pub struct ExpenseQueries;

impl ExpenseQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_expense: &NewExpense) -> Result<i64> {
        let id = sqlx::query(
            "INSERT INTO expenses (date, amount, category, subcategory, note) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new_expense.date)
        .bind(new_expense.amount)
        .bind(&new_expense.category)
        .bind(&new_expense.subcategory)
        .bind(&new_expense.note)
        .execute(pool)
        .await
        .context("Failed to create expense")?
        .last_insert_rowid();

        debug!("Created expense {}", id);
        Ok(id)
    }

    #[inline]
    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Expense>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query_as::<_, Expense>(EXPENSE_BY_ID)
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("Failed to get expense by id")?;

        Ok(result)
    }

    #[inline]
    pub async fn list(pool: &SqlitePool, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let mut builder = QueryBuilder::<Sqlite>::new(EXPENSE_COLUMNS);
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY id ASC");

        let expenses = builder
            .build_query_as::<Expense>()
            .fetch_all(pool)
            .await
            .context("Failed to list expenses")?;

        Ok(expenses)
    }

    /// Apply a partial update; `None` when no expense has `id`
    #[inline]
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        update: &ExpenseUpdate,
    ) -> Result<Option<Expense>> {
        if update.is_empty() {
            return Self::get_by_id(pool, id).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE expenses SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(date) = &update.date {
                fields.push("date = ").push_bind_unseparated(date.as_str());
            }
            if let Some(amount) = update.amount {
                fields.push("amount = ").push_bind_unseparated(amount);
            }
            if let Some(category) = &update.category {
                fields.push("category = ").push_bind_unseparated(category.as_str());
            }
            if let Some(subcategory) = &update.subcategory {
                fields
                    .push("subcategory = ")
                    .push_bind_unseparated(subcategory.as_str());
            }
            if let Some(note) = &update.note {
                fields.push("note = ").push_bind_unseparated(note.as_str());
            }
        }
        builder.push(" WHERE id = ").push_bind(id);

        let mut tx = pool
            .begin()
            .await
            .context("Failed to begin expense update")?;

        let rows_affected = builder
            .build()
            .execute(&mut *tx)
            .await
            .context("Failed to update expense")?
            .rows_affected();

        if rows_affected == 0 {
            // Dropping the transaction rolls it back
            return Ok(None);
        }

        let updated = Self::get_by_id(&mut *tx, id).await?;
        tx.commit()
            .await
            .context("Failed to commit expense update")?;

        Ok(updated)
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete expense")?;

        Ok(result.rows_affected() > 0)
    }

    /// Sum amounts per category over the filtered rows
    ///
    /// Rows are folded in id order so each total is bit-for-bit the sum a
    /// caller gets by adding up the matching rows of [`Self::list`].
    #[inline]
    pub async fn summarize(pool: &SqlitePool, filter: &ExpenseFilter) -> Result<CategoryTotals> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT category, amount FROM expenses");
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY id ASC");

        let rows = builder
            .build_query_as::<(String, f64)>()
            .fetch_all(pool)
            .await
            .context("Failed to summarize expenses")?;

        let mut totals = CategoryTotals::new();
        for (category, amount) in rows {
            *totals.entry(category).or_insert(0.0) += amount;
        }

        Ok(totals)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses")
            .fetch_one(pool)
            .await
            .context("Failed to count expenses")?;

        Ok(count)
    }
}

fn push_filter<'args>(builder: &mut QueryBuilder<'args, Sqlite>, filter: &'args ExpenseFilter) {
    let mut keyword = " WHERE ";

    if let Some(start_date) = &filter.start_date {
        builder
            .push(keyword)
            .push("date >= ")
            .push_bind(start_date.as_str());
        keyword = " AND ";
    }
    if let Some(end_date) = &filter.end_date {
        builder
            .push(keyword)
            .push("date <= ")
            .push_bind(end_date.as_str());
        keyword = " AND ";
    }
    if let Some(category) = &filter.category {
        builder
            .push(keyword)
            .push("category = ")
            .push_bind(category.as_str());
    }
}
