//! Input checks applied at the store's write boundary.

use chrono::NaiveDate;

use crate::categories::CategoryRegistry;
use crate::database::{ExpenseUpdate, NewExpense};
use crate::{ExpenseError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Dates are stored as `YYYY-MM-DD`, which keeps string order equal to date order
#[inline]
pub fn validate_date(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ExpenseError::Validation(format!("{field} cannot be empty")));
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        // chrono accepts unpadded fields like 2024-1-5, which would break ordering
        .filter(|date| date.format(DATE_FORMAT).to_string() == value)
        .map(|_| ())
        .ok_or_else(|| {
            ExpenseError::Validation(format!(
                "{field} must be a calendar date in YYYY-MM-DD format, got '{value}'"
            ))
        })
}

#[inline]
pub fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(ExpenseError::Validation(format!(
            "amount must be a finite number, got {amount}"
        )))
    }
}

#[inline]
pub fn validate_category(
    registry: &CategoryRegistry,
    category: &str,
    strict: bool,
) -> Result<()> {
    if category.trim().is_empty() {
        return Err(ExpenseError::Validation(
            "category cannot be empty".to_string(),
        ));
    }

    if strict && !registry.contains(category) {
        let known: Vec<&str> = registry.names().collect();
        return Err(ExpenseError::Validation(format!(
            "unknown category '{category}'. Known categories: {}",
            known.join(", ")
        )));
    }

    Ok(())
}

#[inline]
pub fn validate_new_expense(
    registry: &CategoryRegistry,
    expense: &NewExpense,
    strict: bool,
) -> Result<()> {
    validate_date("date", &expense.date)?;
    validate_amount(expense.amount)?;
    validate_category(registry, &expense.category, strict)
}

#[inline]
pub fn validate_update(
    registry: &CategoryRegistry,
    update: &ExpenseUpdate,
    strict: bool,
) -> Result<()> {
    if let Some(date) = &update.date {
        validate_date("date", date)?;
    }
    if let Some(amount) = update.amount {
        validate_amount(amount)?;
    }
    if let Some(category) = &update.category {
        validate_category(registry, category, strict)?;
    }
    Ok(())
}
