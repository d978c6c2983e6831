//! Tripfund CLI - Travel budget tracker
//!
//! Usage:
//!   tripfund init                                  Initialize database
//!   tripfund expenses -u me add food 88 dumplings  Record an expense
//!   tripfund summary -u me -b 10000                Show the budget snapshot
//!   tripfund analyze -u me -b 10000                Get spending advice
//!   tripfund serve --port 3000                     Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Expenses { user, action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_expenses_list(&db, &user, 20, None, None),
                Some(ExpensesAction::List {
                    limit,
                    category,
                    plan,
                }) => commands::cmd_expenses_list(&db, &user, limit, category, plan),
                Some(ExpensesAction::Add {
                    category,
                    amount,
                    description,
                    currency,
                    date,
                    plan,
                }) => {
                    let expense = commands::build_expense(
                        category,
                        amount,
                        &description,
                        &currency,
                        date.as_deref(),
                        plan,
                    )?;
                    commands::cmd_expenses_add(&db, &user, expense).map(|_| ())
                }
                Some(ExpensesAction::Delete { id }) => {
                    commands::cmd_expenses_delete(&db, &user, &id)
                }
            }
        }
        Commands::Summary { budget } => {
            let backing = commands::open_backing(&cli.db, cli.no_encrypt, budget.server.as_deref())?;
            commands::cmd_summary(backing, &budget.user, budget.budget)
                .await
                .map(|_| ())
        }
        Commands::Analyze {
            budget,
            language,
            model,
        } => {
            let backing = commands::open_backing(&cli.db, cli.no_encrypt, budget.server.as_deref())?;
            let ai = commands::analysis_client(model.as_deref())?;
            commands::cmd_analyze(backing, &budget.user, budget.budget, language, ai)
                .await
                .map(|_| ())
        }
    }
}
