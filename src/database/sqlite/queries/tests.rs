use super::*;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::raw_sql(include_str!("../migrations/001_initial_schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

async fn seed(pool: &SqlitePool) -> Vec<i64> {
    let rows = [
        NewExpense::new("2024-01-01", 12.5, "food").with_note("lunch"),
        NewExpense::new("2024-01-02", 40.0, "transport"),
        NewExpense::new("2024-01-15", 7.25, "food").with_subcategory("coffee"),
        NewExpense::new("2024-02-03", 100.0, "housing"),
    ];

    let mut ids = Vec::new();
    for row in &rows {
        ids.push(
            ExpenseQueries::create(pool, row)
                .await
                .expect("Failed to create expense"),
        );
    }
    ids
}

#[tokio::test]
async fn expense_crud_operations() {
    let (_temp_dir, pool) = create_test_pool().await;

    let new_expense = NewExpense::new("2024-01-01", 12.5, "food").with_note("lunch");
    let id = ExpenseQueries::create(&pool, &new_expense)
        .await
        .expect("Failed to create expense");

    let created = ExpenseQueries::get_by_id(&pool, id)
        .await
        .expect("Failed to get expense")
        .expect("Expense should exist");

    assert_eq!(created.id, id);
    assert_eq!(created.date, "2024-01-01");
    assert_eq!(created.amount, 12.5);
    assert_eq!(created.category, "food");
    assert_eq!(created.subcategory, "");
    assert_eq!(created.note, "lunch");

    let update = ExpenseUpdate {
        amount: Some(15.0),
        ..ExpenseUpdate::default()
    };
    let updated = ExpenseQueries::update(&pool, id, &update)
        .await
        .expect("Failed to update expense")
        .expect("Expense should exist");

    assert_eq!(updated.amount, 15.0);
    assert_eq!(updated.date, created.date);
    assert_eq!(updated.category, created.category);
    assert_eq!(updated.note, created.note);

    let deleted = ExpenseQueries::delete(&pool, id)
        .await
        .expect("Failed to delete expense");
    assert!(deleted);

    let missing = ExpenseQueries::get_by_id(&pool, id)
        .await
        .expect("Failed to get expense");
    assert!(missing.is_none());

    let deleted_again = ExpenseQueries::delete(&pool, id)
        .await
        .expect("Failed to delete expense");
    assert!(!deleted_again);
}

#[tokio::test]
async fn ids_are_never_reused() {
    let (_temp_dir, pool) = create_test_pool().await;
    let ids = seed(&pool).await;

    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let last = *ids.last().expect("seeded ids");
    assert!(
        ExpenseQueries::delete(&pool, last)
            .await
            .expect("Failed to delete")
    );

    let next = ExpenseQueries::create(&pool, &NewExpense::new("2024-03-01", 1.0, "misc"))
        .await
        .expect("Failed to create expense");
    assert!(next > last);
}

#[tokio::test]
async fn update_missing_expense() {
    let (_temp_dir, pool) = create_test_pool().await;

    let update = ExpenseUpdate {
        note: Some("nothing here".to_string()),
        ..ExpenseUpdate::default()
    };
    let result = ExpenseQueries::update(&pool, 42, &update)
        .await
        .expect("Update should not fail");
    assert!(result.is_none());

    let empty = ExpenseQueries::update(&pool, 42, &ExpenseUpdate::default())
        .await
        .expect("Update should not fail");
    assert!(empty.is_none());
}

#[tokio::test]
async fn update_every_field() {
    let (_temp_dir, pool) = create_test_pool().await;
    let ids = seed(&pool).await;

    let update = ExpenseUpdate {
        date: Some("2024-01-03".to_string()),
        amount: Some(-5.0),
        category: Some("misc".to_string()),
        subcategory: Some("refund".to_string()),
        note: Some(String::new()),
    };
    let updated = ExpenseQueries::update(&pool, ids[0], &update)
        .await
        .expect("Failed to update expense")
        .expect("Expense should exist");

    assert_eq!(updated.date, "2024-01-03");
    assert_eq!(updated.amount, -5.0);
    assert_eq!(updated.category, "misc");
    assert_eq!(updated.subcategory, "refund");
    assert_eq!(updated.note, "");
}

#[tokio::test]
async fn list_filters() {
    let (_temp_dir, pool) = create_test_pool().await;
    let ids = seed(&pool).await;

    let all = ExpenseQueries::list(&pool, &ExpenseFilter::default())
        .await
        .expect("Failed to list expenses");
    assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), ids);

    let january = ExpenseQueries::list(&pool, &ExpenseFilter::between("2024-01-01", "2024-01-31"))
        .await
        .expect("Failed to list expenses");
    assert_eq!(january.len(), 3);

    let food = ExpenseQueries::list(&pool, &ExpenseFilter::for_category("food"))
        .await
        .expect("Failed to list expenses");
    assert_eq!(food.iter().map(|e| e.id).collect::<Vec<_>>(), vec![ids[0], ids[2]]);

    let combined = ExpenseFilter {
        start_date: Some("2024-01-02".to_string()),
        end_date: None,
        category: Some("food".to_string()),
    };
    let late_food = ExpenseQueries::list(&pool, &combined)
        .await
        .expect("Failed to list expenses");
    assert_eq!(late_food.len(), 1);
    assert_eq!(late_food[0].subcategory, "coffee");

    let nothing = ExpenseQueries::list(&pool, &ExpenseFilter::for_category("travel"))
        .await
        .expect("Failed to list expenses");
    assert!(nothing.is_empty());

    for expense in &all {
        assert_eq!(
            combined.matches(expense),
            late_food.iter().any(|e| e.id == expense.id)
        );
    }
}

#[tokio::test]
async fn summarize_groups_by_category() {
    let (_temp_dir, pool) = create_test_pool().await;
    seed(&pool).await;

    let totals = ExpenseQueries::summarize(&pool, &ExpenseFilter::default())
        .await
        .expect("Failed to summarize");
    assert_eq!(totals.len(), 3);
    assert_eq!(totals["food"], 12.5 + 7.25);
    assert_eq!(totals["transport"], 40.0);
    assert_eq!(totals["housing"], 100.0);

    let january = ExpenseQueries::summarize(&pool, &ExpenseFilter::between("2024-01-01", "2024-01-31"))
        .await
        .expect("Failed to summarize");
    assert!(!january.contains_key("housing"));

    let transport_only = ExpenseQueries::summarize(&pool, &ExpenseFilter::for_category("transport"))
        .await
        .expect("Failed to summarize");
    assert_eq!(transport_only.keys().collect::<Vec<_>>(), vec!["transport"]);

    let empty = ExpenseQueries::summarize(&pool, &ExpenseFilter::between("2030-01-01", "2030-12-31"))
        .await
        .expect("Failed to summarize");
    assert!(empty.is_empty());
}

#[tokio::test]
async fn count_tracks_rows() {
    let (_temp_dir, pool) = create_test_pool().await;
    assert_eq!(ExpenseQueries::count(&pool).await.expect("count"), 0);

    let ids = seed(&pool).await;
    assert_eq!(ExpenseQueries::count(&pool).await.expect("count"), 4);

    ExpenseQueries::delete(&pool, ids[1])
        .await
        .expect("Failed to delete");
    assert_eq!(ExpenseQueries::count(&pool).await.expect("count"), 3);
}
