use super::*;
use tempfile::TempDir;

async fn create_test_store(strict: bool) -> (TempDir, ExpenseStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let database = Database::open(&temp_dir.path().join("expenses.db"))
        .await
        .expect("Failed to open database");

    let categories = CategoryRegistry::from_map(BTreeMap::from([
        ("food".to_string(), "Groceries and dining".to_string()),
        ("transport".to_string(), "Getting around".to_string()),
    ]))
    .expect("Failed to build registry");

    let store = ExpenseStore::new(Arc::new(database), Arc::new(categories), strict);
    (temp_dir, store)
}

#[tokio::test]
async fn add_and_list() {
    let (_temp_dir, store) = create_test_store(true).await;

    let first = store
        .add_expense(&NewExpense::new("2024-01-01", 12.5, "food").with_note("lunch"))
        .await
        .expect("Failed to add expense");
    let second = store
        .add_expense(&NewExpense::new("2024-01-02", 40.0, "transport"))
        .await
        .expect("Failed to add expense");
    assert!(second > first);

    let expenses = store
        .list_expenses(&ExpenseFilter::default())
        .await
        .expect("Failed to list expenses");
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].note, "lunch");
    assert_eq!(expenses[1].note, "");
}

#[tokio::test]
async fn strict_mode_rejects_unknown_category() {
    let (_temp_dir, store) = create_test_store(true).await;

    let error = store
        .add_expense(&NewExpense::new("2024-01-01", 5.0, "gambling"))
        .await
        .expect_err("unknown category should be rejected");
    assert_eq!(error.kind(), "invalid_input");
    assert!(error.to_string().contains("gambling"));
    assert!(error.to_string().contains("food"));

    let id = store
        .add_expense(&NewExpense::new("2024-01-01", 5.0, "food"))
        .await
        .expect("Failed to add expense");
    let update = ExpenseUpdate {
        category: Some("gambling".to_string()),
        ..ExpenseUpdate::default()
    };
    let error = store
        .edit_expense(id, &update)
        .await
        .expect_err("unknown category should be rejected");
    assert_eq!(error.kind(), "invalid_input");
}

#[tokio::test]
async fn permissive_mode_accepts_unknown_category() {
    let (_temp_dir, store) = create_test_store(false).await;
    assert!(!store.is_strict());

    let id = store
        .add_expense(&NewExpense::new("2024-01-01", 5.0, "gambling"))
        .await
        .expect("permissive mode should accept any category");

    let totals = store
        .summarize(&ExpenseFilter::default())
        .await
        .expect("Failed to summarize");
    assert_eq!(totals["gambling"], 5.0);

    let error = store
        .add_expense(&NewExpense::new("2024-01-01", 5.0, "   "))
        .await
        .expect_err("blank category is never valid");
    assert_eq!(error.kind(), "invalid_input");

    store.delete_expense(id).await.expect("Failed to delete");
}

#[tokio::test]
async fn invalid_dates_and_amounts() {
    let (_temp_dir, store) = create_test_store(true).await;

    for date in ["", "yesterday", "2024-13-01", "2024-02-30", "2024-1-5", "01/02/2024"] {
        let error = store
            .add_expense(&NewExpense::new(date, 1.0, "food"))
            .await
            .expect_err("malformed date should be rejected");
        assert_eq!(error.kind(), "invalid_input", "date {date:?}");
    }

    for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let error = store
            .add_expense(&NewExpense::new("2024-01-01", amount, "food"))
            .await
            .expect_err("non-finite amount should be rejected");
        assert_eq!(error.kind(), "invalid_input");
    }

    store
        .add_expense(&NewExpense::new("2024-02-29", -3.0, "food"))
        .await
        .expect("negative amounts and leap days are valid");
}

#[tokio::test]
async fn inverted_range_matches_nothing() {
    let (_temp_dir, store) = create_test_store(true).await;
    store
        .add_expense(&NewExpense::new("2024-01-15", 8.0, "food"))
        .await
        .expect("Failed to add expense");

    let reversed = ExpenseFilter::between("2024-02-01", "2024-01-01");
    let listed = store
        .list_expenses(&reversed)
        .await
        .expect("inverted range is an empty result, not an error");
    assert!(listed.is_empty());

    let totals = store
        .summarize(&reversed)
        .await
        .expect("inverted range is an empty result, not an error");
    assert!(totals.is_empty());
}

#[tokio::test]
async fn filter_bounds_compare_as_strings() {
    let (_temp_dir, store) = create_test_store(true).await;
    for date in ["2023-12-31", "2024-01-15", "2024-06-30", "2024-12-05"] {
        store
            .add_expense(&NewExpense::new(date, 1.0, "food"))
            .await
            .expect("Failed to add expense");
    }

    // "2024-12-05" sorts after the "2024-12" prefix, so it falls outside
    let prefixes = ExpenseFilter::between("2024-01", "2024-12");
    let listed = store
        .list_expenses(&prefixes)
        .await
        .expect("prefix bounds are accepted");
    let dates: Vec<&str> = listed.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-15", "2024-06-30"]);

    let totals = store
        .summarize(&prefixes)
        .await
        .expect("prefix bounds are accepted");
    assert_eq!(totals["food"], 2.0);

    let unknown_category = store
        .list_expenses(&ExpenseFilter::for_category("gambling"))
        .await
        .expect("unknown category filter simply matches nothing");
    assert!(unknown_category.is_empty());
}

#[tokio::test]
async fn edit_changes_only_supplied_fields() {
    let (_temp_dir, store) = create_test_store(true).await;

    let id = store
        .add_expense(
            &NewExpense::new("2024-01-01", 12.5, "food")
                .with_subcategory("restaurant")
                .with_note("lunch"),
        )
        .await
        .expect("Failed to add expense");

    let update = ExpenseUpdate {
        amount: Some(15.0),
        ..ExpenseUpdate::default()
    };
    let edited = store
        .edit_expense(id, &update)
        .await
        .expect("Failed to edit expense");

    assert_eq!(edited.id, id);
    assert_eq!(edited.amount, 15.0);
    assert_eq!(edited.date, "2024-01-01");
    assert_eq!(edited.category, "food");
    assert_eq!(edited.subcategory, "restaurant");
    assert_eq!(edited.note, "lunch");

    let unchanged = store
        .edit_expense(id, &ExpenseUpdate::default())
        .await
        .expect("empty edit returns the current record");
    assert_eq!(unchanged, edited);
}

#[tokio::test]
async fn not_found_is_reported() {
    let (_temp_dir, store) = create_test_store(true).await;

    let update = ExpenseUpdate {
        amount: Some(1.0),
        ..ExpenseUpdate::default()
    };
    let error = store
        .edit_expense(7, &update)
        .await
        .expect_err("missing expense");
    assert!(error.is_not_found());
    assert!(matches!(error, ExpenseError::NotFound { id: 7 }));

    let error = store.delete_expense(7).await.expect_err("missing expense");
    assert!(error.is_not_found());
    assert_eq!(error.kind(), "not_found");
}

#[tokio::test]
async fn delete_twice() {
    let (_temp_dir, store) = create_test_store(true).await;

    let id = store
        .add_expense(&NewExpense::new("2024-01-01", 12.5, "food"))
        .await
        .expect("Failed to add expense");

    store.delete_expense(id).await.expect("first delete succeeds");
    let listed = store
        .list_expenses(&ExpenseFilter::default())
        .await
        .expect("Failed to list expenses");
    assert!(listed.iter().all(|e| e.id != id));

    let error = store
        .delete_expense(id)
        .await
        .expect_err("second delete reports not found");
    assert!(error.is_not_found());
}

#[tokio::test]
async fn summary_agrees_with_listing() {
    let (_temp_dir, store) = create_test_store(true).await;

    let rows = [
        ("2024-01-01", 0.1, "food"),
        ("2024-01-03", 0.2, "food"),
        ("2024-01-04", 0.3, "food"),
        ("2024-01-05", 19.99, "transport"),
        ("2024-02-01", 3.33, "food"),
        ("2024-02-07", 1e-3, "transport"),
    ];
    for (date, amount, category) in rows {
        store
            .add_expense(&NewExpense::new(date, amount, category))
            .await
            .expect("Failed to add expense");
    }

    let filters = [
        ExpenseFilter::default(),
        ExpenseFilter::between("2024-01-01", "2024-01-31"),
        ExpenseFilter::for_category("transport"),
        ExpenseFilter::between("2025-01-01", "2025-12-31"),
    ];

    for filter in &filters {
        let listed = store.list_expenses(filter).await.expect("list");
        let totals = store.summarize(filter).await.expect("summarize");

        let mut expected = CategoryTotals::new();
        for expense in &listed {
            *expected.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
        }
        assert_eq!(totals, expected, "filter {filter:?}");
    }
}

#[tokio::test]
async fn categories_are_exposed() {
    let (_temp_dir, store) = create_test_store(true).await;

    let categories = store.get_categories();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories["food"], "Groceries and dining");
    assert_eq!(store.categories().len(), 2);
}
