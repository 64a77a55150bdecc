#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests for the expense store opened from a config directory,
// the way the CLI and MCP server open it

use std::collections::BTreeMap;
use std::fs;

use tempfile::TempDir;

use expense_mcp::categories::DEFAULT_CATEGORIES;
use expense_mcp::commands::{init_config, load_categories, open_store};
use expense_mcp::config::{CategoriesConfig, Config};
use expense_mcp::database::{ExpenseFilter, ExpenseUpdate, NewExpense};
use expense_mcp::expenses::ExpenseStore;

/// Create a config rooted in a fresh temp directory and open its store
async fn create_test_setup() -> anyhow::Result<(Config, ExpenseStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("categories.json"), DEFAULT_CATEGORIES)?;

    let config = Config::with_base_dir(temp_dir.path());
    let store = open_store(&config).await?;
    Ok((config, store, temp_dir))
}

/// The scripted session: add, filter, summarize, edit, delete
#[tokio::test]
async fn expense_lifecycle() {
    let (_config, store, _temp_dir) = create_test_setup().await.expect("can create test setup");

    let lunch = store
        .add_expense(&NewExpense::new("2024-01-01", 12.50, "food").with_note("lunch"))
        .await
        .expect("Failed to add lunch");
    assert_eq!(lunch, 1);

    let bus = store
        .add_expense(&NewExpense::new("2024-01-02", 40.00, "transport"))
        .await
        .expect("Failed to add bus fare");
    assert_eq!(bus, 2);

    let food = store
        .list_expenses(&ExpenseFilter::for_category("food"))
        .await
        .expect("Failed to list food");
    assert_eq!(food.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);
    assert_eq!(food[0].note, "lunch");

    let totals = store
        .summarize(&ExpenseFilter::default())
        .await
        .expect("Failed to summarize");
    assert_eq!(
        totals,
        BTreeMap::from([("food".to_string(), 12.5), ("transport".to_string(), 40.0)])
    );

    let update = ExpenseUpdate {
        amount: Some(15.0),
        ..ExpenseUpdate::default()
    };
    let edited = store
        .edit_expense(1, &update)
        .await
        .expect("Failed to edit lunch");
    assert_eq!(edited.amount, 15.0);
    assert_eq!(edited.note, "lunch");

    let totals = store
        .summarize(&ExpenseFilter::default())
        .await
        .expect("Failed to summarize");
    assert_eq!(
        totals,
        BTreeMap::from([("food".to_string(), 15.0), ("transport".to_string(), 40.0)])
    );

    store.delete_expense(2).await.expect("Failed to delete");

    let remaining = store
        .list_expenses(&ExpenseFilter::default())
        .await
        .expect("Failed to list");
    assert_eq!(remaining.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);

    let error = store
        .delete_expense(2)
        .await
        .expect_err("second delete should report not found");
    assert!(error.is_not_found());
}

/// Records survive closing and reopening the store
#[tokio::test]
async fn data_persists_across_reopen() {
    let (config, store, _temp_dir) = create_test_setup().await.expect("can create test setup");

    let id = store
        .add_expense(&NewExpense::new("2024-05-05", 9.99, "subscriptions"))
        .await
        .expect("Failed to add expense");
    drop(store);

    let reopened = open_store(&config).await.expect("Failed to reopen store");
    let expenses = reopened
        .list_expenses(&ExpenseFilter::default())
        .await
        .expect("Failed to list");
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].id, id);
    assert_eq!(expenses[0].category, "subscriptions");

    let next = reopened
        .add_expense(&NewExpense::new("2024-05-06", 1.0, "misc"))
        .await
        .expect("Failed to add expense");
    assert!(next > id);
}

/// Date range filters are inclusive at both ends
#[tokio::test]
async fn date_range_is_inclusive() {
    let (_config, store, _temp_dir) = create_test_setup().await.expect("can create test setup");

    for date in ["2024-01-31", "2024-02-01", "2024-02-29", "2024-03-01"] {
        store
            .add_expense(&NewExpense::new(date, 1.0, "food"))
            .await
            .expect("Failed to add expense");
    }

    let february = store
        .list_expenses(&ExpenseFilter::between("2024-02-01", "2024-02-29"))
        .await
        .expect("Failed to list");
    let dates: Vec<&str> = february.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-02-01", "2024-02-29"]);

    let totals = store
        .summarize(&ExpenseFilter::between("2024-02-01", "2024-02-29"))
        .await
        .expect("Failed to summarize");
    assert_eq!(totals["food"], 2.0);
}

/// `init` writes both files and leaves existing ones alone
#[tokio::test]
async fn init_writes_default_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let dir = temp_dir.path().join("expense-mcp");

    init_config(&dir).expect("init should succeed");
    assert!(dir.join("config.toml").exists());
    assert!(dir.join("categories.json").exists());

    let config = Config::load(&dir).expect("Failed to load written config");
    assert!(config.categories.strict);
    let categories = load_categories(&config).expect("Failed to load categories");
    assert!(categories.contains("food"));

    fs::write(dir.join("categories.json"), r#"{"rent": "Monthly rent"}"#)
        .expect("Failed to overwrite categories");
    init_config(&dir).expect("second init should succeed");

    let categories = load_categories(&config).expect("Failed to load categories");
    assert_eq!(categories.len(), 1);
    assert!(categories.contains("rent"));
}

/// Custom category files drive validation; permissive mode relaxes it
#[tokio::test]
async fn custom_categories_and_permissive_mode() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    fs::write(
        temp_dir.path().join("categories.json"),
        r#"{"rent": "Monthly rent", "coffee": "Caffeine"}"#,
    )
    .expect("Failed to write categories");

    let strict = Config::with_base_dir(temp_dir.path());
    let store = open_store(&strict).await.expect("Failed to open store");
    assert_eq!(store.get_categories().len(), 2);

    let error = store
        .add_expense(&NewExpense::new("2024-01-01", 3.0, "food"))
        .await
        .expect_err("food is not in the custom file");
    assert_eq!(error.kind(), "invalid_input");
    drop(store);

    let permissive = Config {
        categories: CategoriesConfig {
            strict: false,
            ..CategoriesConfig::default()
        },
        ..Config::with_base_dir(temp_dir.path())
    };
    let store = open_store(&permissive).await.expect("Failed to open store");
    store
        .add_expense(&NewExpense::new("2024-01-01", 3.0, "food"))
        .await
        .expect("permissive mode accepts any category");
}

/// A broken category file stops startup
#[tokio::test]
async fn malformed_category_file_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    fs::write(temp_dir.path().join("categories.json"), "not json")
        .expect("Failed to write categories");

    let config = Config::with_base_dir(temp_dir.path());
    let result = open_store(&config).await;
    assert!(result.is_err());
}

/// Startup without a category file fails instead of guessing categories
#[tokio::test]
async fn missing_category_file_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let config = Config::with_base_dir(temp_dir.path());
    let error = open_store(&config)
        .await
        .expect_err("a missing category file should stop startup");
    assert!(format!("{error:#}").contains("categories.json"));
    assert!(load_categories(&config).is_err());

    init_config(temp_dir.path()).expect("init should succeed");
    open_store(&config)
        .await
        .expect("store opens once init has written the category file");
}

/// Concurrent writers through one store all land
#[tokio::test]
async fn concurrent_adds_get_unique_ids() {
    let (_config, store, _temp_dir) = create_test_setup().await.expect("can create test setup");
    let store = std::sync::Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = std::sync::Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .add_expense(&NewExpense::new("2024-06-01", f64::from(i), "misc"))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(
            handle
                .await
                .expect("Task failed")
                .expect("Failed to add expense"),
        );
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);

    let count = store
        .list_expenses(&ExpenseFilter::default())
        .await
        .expect("Failed to list")
        .len();
    assert_eq!(count, 20);
}
