//! MCP Tools Implementation
//!
//! One [`ToolHandler`] per expense operation, plus the category resource.
//! Domain failures (not found, invalid input, storage errors) come back as
//! `isError` tool results carrying a JSON body, so a bad call never turns
//! into a JSON-RPC protocol error.

use crate::ExpenseError;
use crate::database::{ExpenseFilter, ExpenseUpdate, NewExpense};
use crate::expenses::ExpenseStore;
use crate::mcp::protocol::*;
use crate::mcp::server::{McpServer, ResourceHandler, ToolHandler};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// URI of the category resource
pub const CATEGORIES_URI: &str = "expense://categories";

/// Amounts arrive as JSON numbers, though some clients quote them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn into_f64(self) -> Result<f64, ExpenseError> {
        match self {
            Self::Number(value) => Ok(value),
            Self::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                ExpenseError::Validation(format!("amount must be a number, got '{text}'"))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddExpenseArgs {
    date: String,
    amount: Amount,
    category: String,
    subcategory: Option<String>,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterArgs {
    start_date: Option<String>,
    end_date: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditExpenseArgs {
    id: i64,
    date: Option<String>,
    amount: Option<Amount>,
    category: Option<String>,
    subcategory: Option<String>,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteExpenseArgs {
    id: i64,
}

impl FilterArgs {
    /// Blank strings mean "no filter"
    fn into_filter(self) -> ExpenseFilter {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        ExpenseFilter {
            start_date: present(self.start_date),
            end_date: present(self.end_date),
            category: present(self.category),
        }
    }
}

fn parse_arguments<T: DeserializeOwned>(params: CallToolParams) -> Result<T, ExpenseError> {
    let arguments: serde_json::Map<String, Value> =
        params.arguments.unwrap_or_default().into_iter().collect();

    serde_json::from_value(Value::Object(arguments)).map_err(|e| {
        ExpenseError::Validation(format!("invalid arguments for {}: {}", params.name, e))
    })
}

/// Tool result describing a failed operation
fn error_result(tool: &str, err: &ExpenseError) -> Result<CallToolResult> {
    if err.is_not_found() {
        debug!("{} target missing: {}", tool, err);
    } else if matches!(err, ExpenseError::Validation(_)) {
        warn!("{} rejected input: {}", tool, err);
    } else {
        error!("{} failed: {}", tool, err);
    }

    let mut body = json!({
        "status": "error",
        "error": err.kind(),
        "message": err.to_string(),
    });
    if let ExpenseError::NotFound { id } = err {
        body["id"] = json!(id);
    }

    Ok(CallToolResult::error(&body)?)
}

fn filter_properties() -> Value {
    json!({
        "start_date": {
            "type": "string",
            "description": "Optional: inclusive lower bound, YYYY-MM-DD"
        },
        "end_date": {
            "type": "string",
            "description": "Optional: inclusive upper bound, YYYY-MM-DD"
        },
        "category": {
            "type": "string",
            "description": "Optional: only include this category"
        }
    })
}

/// add_expense tool handler
pub struct AddExpenseHandler {
    store: Arc<ExpenseStore>,
}

impl AddExpenseHandler {
    #[inline]
    pub fn new(store: Arc<ExpenseStore>) -> Self {
        Self { store }
    }

    /// Create the add_expense tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "add_expense".to_string(),
            description: Some("Add a new expense entry to the database".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "date": {
                        "type": "string",
                        "description": "Date of the expense, YYYY-MM-DD"
                    },
                    "amount": {
                        "type": "number",
                        "description": "Amount spent"
                    },
                    "category": {
                        "type": "string",
                        "description": "Category name, see get_categories"
                    },
                    "subcategory": {
                        "type": "string",
                        "description": "Optional: free-form subcategory"
                    },
                    "note": {
                        "type": "string",
                        "description": "Optional: free-form note"
                    }
                },
                "required": ["date", "amount", "category"],
                "additionalProperties": false
            }),
        }
    }

    async fn add(&self, params: CallToolParams) -> crate::Result<i64> {
        let args: AddExpenseArgs = parse_arguments(params)?;
        let new_expense = NewExpense {
            date: args.date,
            amount: args.amount.into_f64()?,
            category: args.category,
            subcategory: args.subcategory.unwrap_or_default(),
            note: args.note.unwrap_or_default(),
        };
        self.store.add_expense(&new_expense).await
    }
}

#[async_trait]
impl ToolHandler for AddExpenseHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        match self.add(params).await {
            Ok(id) => Ok(CallToolResult::json(&json!({
                "status": "ok",
                "id": id,
                "message": "Expense added successfully"
            }))?),
            Err(e) => error_result("add_expense", &e),
        }
    }
}

/// list_expenses tool handler
pub struct ListExpensesHandler {
    store: Arc<ExpenseStore>,
}

impl ListExpensesHandler {
    #[inline]
    pub fn new(store: Arc<ExpenseStore>) -> Self {
        Self { store }
    }

    /// Create the list_expenses tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "list_expenses".to_string(),
            description: Some(
                "List expense entries, optionally within an inclusive date range and for one category"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": filter_properties(),
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for ListExpensesHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let filter = match parse_arguments::<FilterArgs>(params) {
            Ok(args) => args.into_filter(),
            Err(e) => return error_result("list_expenses", &e),
        };

        match self.store.list_expenses(&filter).await {
            Ok(expenses) => Ok(CallToolResult::json(&json!({
                "expenses": expenses,
                "count": expenses.len()
            }))?),
            Err(e) => error_result("list_expenses", &e),
        }
    }
}

/// edit_expense tool handler
pub struct EditExpenseHandler {
    store: Arc<ExpenseStore>,
}

impl EditExpenseHandler {
    #[inline]
    pub fn new(store: Arc<ExpenseStore>) -> Self {
        Self { store }
    }

    /// Create the edit_expense tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "edit_expense".to_string(),
            description: Some(
                "Edit an existing expense by id; only the supplied fields change".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "Id of the expense to edit"
                    },
                    "date": {
                        "type": "string",
                        "description": "Optional: new date, YYYY-MM-DD"
                    },
                    "amount": {
                        "type": "number",
                        "description": "Optional: new amount"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional: new category"
                    },
                    "subcategory": {
                        "type": "string",
                        "description": "Optional: new subcategory"
                    },
                    "note": {
                        "type": "string",
                        "description": "Optional: new note"
                    }
                },
                "required": ["id"],
                "additionalProperties": false
            }),
        }
    }

    async fn edit(&self, params: CallToolParams) -> crate::Result<crate::database::Expense> {
        let args: EditExpenseArgs = parse_arguments(params)?;
        let update = ExpenseUpdate {
            date: args.date,
            amount: args.amount.map(Amount::into_f64).transpose()?,
            category: args.category,
            subcategory: args.subcategory,
            note: args.note,
        };
        self.store.edit_expense(args.id, &update).await
    }
}

#[async_trait]
impl ToolHandler for EditExpenseHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        match self.edit(params).await {
            Ok(expense) => Ok(CallToolResult::json(&json!({
                "status": "ok",
                "expense": expense
            }))?),
            Err(e) => error_result("edit_expense", &e),
        }
    }
}

/// delete_expense tool handler
pub struct DeleteExpenseHandler {
    store: Arc<ExpenseStore>,
}

impl DeleteExpenseHandler {
    #[inline]
    pub fn new(store: Arc<ExpenseStore>) -> Self {
        Self { store }
    }

    /// Create the delete_expense tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "delete_expense".to_string(),
            description: Some("Delete an expense by id".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "Id of the expense to delete"
                    }
                },
                "required": ["id"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for DeleteExpenseHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args: DeleteExpenseArgs = match parse_arguments(params) {
            Ok(args) => args,
            Err(e) => return error_result("delete_expense", &e),
        };

        match self.store.delete_expense(args.id).await {
            Ok(()) => Ok(CallToolResult::json(&json!({
                "status": "ok",
                "id": args.id,
                "message": "Expense deleted"
            }))?),
            Err(e) => error_result("delete_expense", &e),
        }
    }
}

/// summarize tool handler
pub struct SummarizeHandler {
    store: Arc<ExpenseStore>,
}

impl SummarizeHandler {
    #[inline]
    pub fn new(store: Arc<ExpenseStore>) -> Self {
        Self { store }
    }

    /// Create the summarize tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "summarize".to_string(),
            description: Some(
                "Total expenses per category, optionally within an inclusive date range"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": filter_properties(),
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SummarizeHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let filter = match parse_arguments::<FilterArgs>(params) {
            Ok(args) => args.into_filter(),
            Err(e) => return error_result("summarize", &e),
        };

        match self.store.summarize(&filter).await {
            Ok(totals) => Ok(CallToolResult::json(&json!({ "totals": totals }))?),
            Err(e) => error_result("summarize", &e),
        }
    }
}

/// get_categories tool handler
pub struct GetCategoriesHandler {
    store: Arc<ExpenseStore>,
}

impl GetCategoriesHandler {
    #[inline]
    pub fn new(store: Arc<ExpenseStore>) -> Self {
        Self { store }
    }

    /// Create the get_categories tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "get_categories".to_string(),
            description: Some("List the allowed expense categories".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for GetCategoriesHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        Ok(CallToolResult::json(&json!({
            "categories": self.store.categories().to_json()
        }))?)
    }
}

/// `expense://categories` resource handler
pub struct CategoriesResourceHandler {
    store: Arc<ExpenseStore>,
}

impl CategoriesResourceHandler {
    #[inline]
    pub fn new(store: Arc<ExpenseStore>) -> Self {
        Self { store }
    }

    #[inline]
    pub fn resource_definition() -> Resource {
        Resource {
            uri: CATEGORIES_URI.to_string(),
            name: "categories".to_string(),
            description: Some("Allowed expense categories and their descriptions".to_string()),
            mime_type: Some("application/json".to_string()),
        }
    }
}

#[async_trait]
impl ResourceHandler for CategoriesResourceHandler {
    #[inline]
    async fn handle(&self, uri: &str) -> Result<ReadResourceResult> {
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("application/json".to_string()),
                text: serde_json::to_string_pretty(&self.store.categories().to_json())?,
            }],
        })
    }
}

/// Register every expense tool and the category resource on `server`
#[inline]
pub async fn register_expense_tools(server: &McpServer, store: &Arc<ExpenseStore>) -> Result<()> {
    server
        .register_tool(
            AddExpenseHandler::tool_definition(),
            AddExpenseHandler::new(Arc::clone(store)),
        )
        .await?;
    server
        .register_tool(
            ListExpensesHandler::tool_definition(),
            ListExpensesHandler::new(Arc::clone(store)),
        )
        .await?;
    server
        .register_tool(
            EditExpenseHandler::tool_definition(),
            EditExpenseHandler::new(Arc::clone(store)),
        )
        .await?;
    server
        .register_tool(
            DeleteExpenseHandler::tool_definition(),
            DeleteExpenseHandler::new(Arc::clone(store)),
        )
        .await?;
    server
        .register_tool(
            SummarizeHandler::tool_definition(),
            SummarizeHandler::new(Arc::clone(store)),
        )
        .await?;
    server
        .register_tool(
            GetCategoriesHandler::tool_definition(),
            GetCategoriesHandler::new(Arc::clone(store)),
        )
        .await?;
    server
        .register_resource(
            CategoriesResourceHandler::resource_definition(),
            CategoriesResourceHandler::new(Arc::clone(store)),
        )
        .await?;

    Ok(())
}
