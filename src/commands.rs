use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::categories::{CategoryRegistry, DEFAULT_CATEGORIES};
use crate::config::Config;
use crate::database::{Database, Expense, ExpenseFilter, ExpenseUpdate, NewExpense};
use crate::expenses::ExpenseStore;
use crate::mcp::McpServer;
use crate::mcp::tools::register_expense_tools;

const SERVER_INSTRUCTIONS: &str = "Track personal expenses. Dates use YYYY-MM-DD. \
Call get_categories before adding expenses to see the allowed categories.";

/// Load the category registry named by `config`
///
/// A missing, unreadable or malformed category file is an error; `init`
/// writes the bundled defaults.
#[inline]
pub fn load_categories(config: &Config) -> Result<CategoryRegistry> {
    let path = config.categories_path();

    CategoryRegistry::load(&path).with_context(|| {
        format!(
            "Failed to load categories from {} (run 'expense-mcp init' to create it)",
            path.display()
        )
    })
}

/// Open the database and category registry described by `config`
#[inline]
pub async fn open_store(config: &Config) -> Result<ExpenseStore> {
    let categories = load_categories(config)?;

    let database = Database::open(&config.database_path())
        .await
        .context("Failed to initialize database")?;

    Ok(ExpenseStore::new(
        Arc::new(database),
        Arc::new(categories),
        config.categories.strict,
    ))
}

/// Build an MCP server with every expense tool registered
#[inline]
pub async fn build_server(store: ExpenseStore) -> Result<Arc<McpServer>> {
    let store = Arc::new(store);

    let server = McpServer::new(
        "expense-mcp".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    )
    .context("Failed to create MCP server")?
    .with_instructions(SERVER_INSTRUCTIONS);

    register_expense_tools(&server, &store)
        .await
        .context("Failed to register expense tools")?;

    Ok(Arc::new(server))
}

/// Start the MCP server on stdio
///
/// Stdout carries the JSON-RPC stream, so everything here reports through
/// tracing.
#[inline]
pub async fn serve_mcp(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    info!(
        "Serving expenses from {} ({} categories, {} mode)",
        config.database_path().display(),
        store.categories().len(),
        if store.is_strict() {
            "strict"
        } else {
            "permissive"
        }
    );

    let server = build_server(store).await?;
    server.serve_stdio().await?;

    info!("MCP server stopped");
    Ok(())
}

/// Write a default config file and category file into `config_dir`
///
/// Existing files are left untouched.
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;

    let config_path = config.config_file_path();
    if config_path.exists() {
        println!("Config file already exists: {}", config_path.display());
    } else {
        config.save()?;
        println!("Created config file: {}", config_path.display());
    }

    let categories_path = config.categories_path();
    if categories_path.exists() {
        println!(
            "Category file already exists: {}",
            categories_path.display()
        );
    } else {
        if let Some(parent) = categories_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory: {}", parent.display())
            })?;
        }
        fs::write(&categories_path, DEFAULT_CATEGORIES).with_context(|| {
            format!(
                "Failed to write category file: {}",
                categories_path.display()
            )
        })?;
        println!("Created category file: {}", categories_path.display());
    }

    Ok(())
}

fn print_expense(expense: &Expense) {
    let category = if expense.subcategory.is_empty() {
        expense.category.clone()
    } else {
        format!("{}/{}", expense.category, expense.subcategory)
    };

    if expense.note.is_empty() {
        println!(
            "#{:<5} {}  {:>10.2}  {}",
            expense.id, expense.date, expense.amount, category
        );
    } else {
        println!(
            "#{:<5} {}  {:>10.2}  {}  ({})",
            expense.id, expense.date, expense.amount, category, expense.note
        );
    }
}

/// Record an expense from the command line
#[inline]
pub async fn add_expense(config: &Config, new_expense: &NewExpense) -> Result<()> {
    let store = open_store(config).await?;
    let id = store.add_expense(new_expense).await?;

    println!("Added expense #{id}");
    Ok(())
}

/// Print the expenses matching `filter`
#[inline]
pub async fn list_expenses(config: &Config, filter: &ExpenseFilter) -> Result<()> {
    let store = open_store(config).await?;
    let expenses = store.list_expenses(filter).await?;

    if expenses.is_empty() {
        println!("No expenses found.");
        println!("Use 'expense-mcp add <date> <amount> <category>' to record one.");
        return Ok(());
    }

    println!("Expenses ({} total):", expenses.len());
    println!();
    for expense in &expenses {
        print_expense(expense);
    }

    Ok(())
}

/// Apply `update` to an expense and print the result
#[inline]
pub async fn edit_expense(config: &Config, id: i64, update: &ExpenseUpdate) -> Result<()> {
    let store = open_store(config).await?;
    let expense = store.edit_expense(id, update).await?;

    println!("Updated expense:");
    print_expense(&expense);
    Ok(())
}

#[inline]
pub async fn delete_expense(config: &Config, id: i64) -> Result<()> {
    let store = open_store(config).await?;
    store.delete_expense(id).await?;

    println!("Deleted expense #{id}");
    Ok(())
}

/// Print per-category totals for `filter`
#[inline]
pub async fn show_summary(config: &Config, filter: &ExpenseFilter) -> Result<()> {
    let store = open_store(config).await?;
    let totals = store.summarize(filter).await?;

    if totals.is_empty() {
        println!("No expenses in range.");
        return Ok(());
    }

    let width = totals.keys().map(String::len).max().unwrap_or(0);
    for (category, total) in &totals {
        println!("{category:<width$}  {total:>10.2}");
    }
    println!("{:<width$}  {:>10.2}", "total", totals.values().sum::<f64>());

    Ok(())
}

#[inline]
pub fn list_categories(config: &Config) -> Result<()> {
    let categories = load_categories(config)?;

    let width = categories.names().map(str::len).max().unwrap_or(0);
    for (name, description) in categories.get_categories() {
        println!("{name:<width$}  {description}");
    }

    Ok(())
}
