use anyhow::Result;
use clap::{Parser, Subcommand};
use expense_mcp::commands::{
    add_expense, delete_expense, edit_expense, init_config, list_categories, list_expenses,
    serve_mcp, show_summary,
};
use expense_mcp::config::{Config, get_config_dir, show_config};
use expense_mcp::database::{ExpenseFilter, ExpenseUpdate, NewExpense};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "expense-mcp")]
#[command(about = "Personal expense tracker with an MCP server")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, the category file and the database
    #[arg(long, global = true, env = "EXPENSE_MCP_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio
    Serve,
    /// Write default config and category files
    Init,
    /// Show the effective configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Record a new expense
    Add {
        /// Date of the expense, YYYY-MM-DD
        date: String,
        /// Amount spent
        #[arg(allow_hyphen_values = true)]
        amount: f64,
        /// Category name
        category: String,
        #[arg(long)]
        subcategory: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// List recorded expenses
    List {
        /// Inclusive start date, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Inclusive end date, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Change fields of an existing expense
    Edit {
        /// Expense ID
        id: i64,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<f64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        subcategory: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete an expense
    Delete {
        /// Expense ID
        id: i64,
    },
    /// Show totals per category
    Summary {
        /// Inclusive start date, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Inclusive end date, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List the allowed categories
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };
    let load_config = || Config::load(&config_dir);

    match cli.command {
        Commands::Serve => {
            serve_mcp(&load_config()?).await?;
        }
        Commands::Init => {
            init_config(&config_dir)?;
        }
        Commands::Config { show } => {
            let config = load_config()?;
            if show {
                show_config(&config);
            } else {
                println!("{}", config.config_file_path().display());
                println!(
                    "Use 'expense-mcp config --show' for details or 'expense-mcp init' to create it."
                );
            }
        }
        Commands::Add {
            date,
            amount,
            category,
            subcategory,
            note,
        } => {
            let new_expense = NewExpense {
                date,
                amount,
                category,
                subcategory: subcategory.unwrap_or_default(),
                note: note.unwrap_or_default(),
            };
            add_expense(&load_config()?, &new_expense).await?;
        }
        Commands::List { from, to, category } => {
            let filter = ExpenseFilter {
                start_date: from,
                end_date: to,
                category,
            };
            list_expenses(&load_config()?, &filter).await?;
        }
        Commands::Edit {
            id,
            date,
            amount,
            category,
            subcategory,
            note,
        } => {
            let update = ExpenseUpdate {
                date,
                amount,
                category,
                subcategory,
                note,
            };
            edit_expense(&load_config()?, id, &update).await?;
        }
        Commands::Delete { id } => {
            delete_expense(&load_config()?, id).await?;
        }
        Commands::Summary { from, to, category } => {
            let filter = ExpenseFilter {
                start_date: from,
                end_date: to,
                category,
            };
            show_summary(&load_config()?, &filter).await?;
        }
        Commands::Categories => {
            list_categories(&load_config()?)?;
        }
    }

    Ok(())
}
