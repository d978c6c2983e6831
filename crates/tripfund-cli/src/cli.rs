//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tripfund_core::models::{ExpenseCategory, Language};

/// Tripfund - Keep travel spending on budget
#[derive(Parser)]
#[command(name = "tripfund")]
#[command(about = "Travel budget tracker with AI spending advice", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tripfund.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TRIPFUND_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, every request needs an owner header or an API key.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage recorded expenses (list, add, delete)
    Expenses {
        /// Owner the expenses belong to
        #[arg(short, long)]
        user: String,

        #[command(subcommand)]
        action: Option<ExpensesAction>,
    },

    /// Show the budget snapshot for stored expenses
    Summary {
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Ask the model for spending advice on stored expenses
    Analyze {
        #[command(flatten)]
        budget: BudgetArgs,

        /// Advice language: zh, en, ja, ko or auto (detect from descriptions)
        #[arg(short, long, default_value = "auto")]
        language: Language,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },
}

/// Budget and expense source shared by `summary` and `analyze`
#[derive(Args)]
pub struct BudgetArgs {
    /// Owner whose expenses are used
    #[arg(short, long)]
    pub user: String,

    /// Total budget to compare spending against
    #[arg(short, long)]
    pub budget: f64,

    /// Read expenses from a running tripfund server instead of the local database
    ///
    /// The API key is read from TRIPFUND_API_KEY when set.
    #[arg(long)]
    pub server: Option<String>,
}

#[derive(Subcommand)]
pub enum ExpensesAction {
    /// List expenses, newest first
    List {
        /// Maximum number of expenses to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Only show one category
        #[arg(short, long)]
        category: Option<ExpenseCategory>,

        /// Only show one travel plan
        #[arg(long)]
        plan: Option<String>,
    },

    /// Record an expense
    Add {
        /// Category: food, transport, accommodation, activity, shopping, other
        category: ExpenseCategory,

        /// Amount spent
        amount: f64,

        /// What the money was spent on
        #[arg(default_value = "")]
        description: String,

        /// Currency code
        #[arg(long, default_value = "CNY")]
        currency: String,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Travel plan the expense belongs to
        #[arg(long)]
        plan: Option<String>,
    },

    /// Delete an expense by id
    Delete {
        /// Expense id
        id: String,
    },
}
