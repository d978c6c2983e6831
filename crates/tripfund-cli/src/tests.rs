//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::Datelike;
use clap::Parser;
use tripfund_core::ai::{AIClient, MockBackend};
use tripfund_core::db::Database;
use tripfund_core::models::{ExpenseCategory, ExpenseFilter, Language, NewExpense};
use tripfund_core::store::{BackingStore, MemoryBackend};
use tripfund_core::{AnalysisOutcome, BudgetStatus};

use crate::cli::{Cli, Commands, ExpensesAction};
use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn seed(db: &Database, owner: &str) {
    for (category, amount, description) in [
        (ExpenseCategory::Food, 3000.0, "hotpot"),
        (ExpenseCategory::Transport, 1500.0, "rail pass"),
    ] {
        db.insert_expense(owner, &NewExpense::new(category, amount, description))
            .unwrap();
    }
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_expense_add() {
    let cli = Cli::try_parse_from([
        "tripfund", "--no-encrypt", "expenses", "--user", "alice", "add", "food", "88.5",
        "dumplings", "--plan", "kyoto",
    ])
    .unwrap();

    assert!(cli.no_encrypt);
    match cli.command {
        Commands::Expenses {
            user,
            action:
                Some(ExpensesAction::Add {
                    category,
                    amount,
                    description,
                    plan,
                    ..
                }),
        } => {
            assert_eq!(user, "alice");
            assert_eq!(category, ExpenseCategory::Food);
            assert_eq!(amount, 88.5);
            assert_eq!(description, "dumplings");
            assert_eq!(plan.as_deref(), Some("kyoto"));
        }
        _ => panic!("expected expenses add"),
    }
}

#[test]
fn test_parse_rejects_unknown_category() {
    let result = Cli::try_parse_from([
        "tripfund", "expenses", "--user", "alice", "add", "spa", "10",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_analyze_language() {
    let cli = Cli::try_parse_from([
        "tripfund", "analyze", "--user", "alice", "--budget", "5000", "--language", "ja",
    ])
    .unwrap();

    match cli.command {
        Commands::Analyze {
            budget, language, ..
        } => {
            assert_eq!(budget.user, "alice");
            assert_eq!(budget.budget, 5000.0);
            assert!(budget.server.is_none());
            assert_eq!(language, Language::Ja);
        }
        _ => panic!("expected analyze"),
    }
}

// ========== Expense Command Tests ==========

#[test]
fn test_build_expense_with_date() {
    let expense = commands::build_expense(
        ExpenseCategory::Activity,
        120.0,
        "  temple entry ",
        "jpy",
        Some("2026-04-03"),
        None,
    )
    .unwrap();

    assert_eq!(expense.description, "temple entry");
    assert_eq!(expense.currency, "JPY");
    let date = expense.date.unwrap();
    assert_eq!((date.year(), date.month(), date.day()), (2026, 4, 3));
}

#[test]
fn test_build_expense_rejects_bad_date() {
    let result = commands::build_expense(
        ExpenseCategory::Food,
        10.0,
        "",
        "CNY",
        Some("03/04/2026"),
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_build_expense_rejects_negative_amount() {
    let result = commands::build_expense(ExpenseCategory::Food, -5.0, "", "CNY", None, None);
    assert!(result.is_err());
}

#[test]
fn test_cmd_expenses_add_and_list() {
    let db = setup_test_db();
    let expense = NewExpense::new(ExpenseCategory::Shopping, 250.0, "souvenirs");

    let stored = commands::cmd_expenses_add(&db, "alice", expense).unwrap();
    assert!(db.get_expense("alice", &stored.id).unwrap().is_some());

    let result = commands::cmd_expenses_list(&db, "alice", 20, None, None);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_expenses_list_empty() {
    let db = setup_test_db();
    let result = commands::cmd_expenses_list(&db, "nobody", 20, Some(ExpenseCategory::Food), None);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_expenses_delete() {
    let db = setup_test_db();
    let stored = db
        .insert_expense("alice", &NewExpense::new(ExpenseCategory::Food, 10.0, "tea"))
        .unwrap();

    // Another owner cannot delete it
    assert!(commands::cmd_expenses_delete(&db, "bob", &stored.id).is_err());
    assert!(commands::cmd_expenses_delete(&db, "alice", &stored.id).is_ok());
    assert!(db.get_expense("alice", &stored.id).unwrap().is_none());
}

// ========== Budget Command Tests ==========

#[tokio::test]
async fn test_cmd_summary() {
    let db = setup_test_db();
    seed(&db, "alice");
    seed(&db, "bob");

    let snapshot = commands::cmd_summary(BackingStore::Sqlite(db), "alice", 5000.0)
        .await
        .unwrap();

    assert_eq!(snapshot.expense_count, 2);
    assert_eq!(snapshot.total_spent, 4500.0);
    assert_eq!(snapshot.remaining, 500.0);
    assert_eq!(snapshot.status(), BudgetStatus::Warning);
}

#[tokio::test]
async fn test_cmd_summary_counts_every_page() {
    let db = setup_test_db();
    for _ in 0..101 {
        db.insert_expense("alice", &NewExpense::new(ExpenseCategory::Food, 10.0, "snack"))
            .unwrap();
    }

    let snapshot = commands::cmd_summary(BackingStore::Sqlite(db), "alice", 1000.0)
        .await
        .unwrap();

    assert_eq!(snapshot.expense_count, 101);
    assert_eq!(snapshot.total_spent, 1010.0);
    assert_eq!(snapshot.status(), BudgetStatus::Overspent);
}

#[tokio::test]
async fn test_cmd_summary_rejects_negative_budget() {
    let result = commands::cmd_summary(BackingStore::Memory(MemoryBackend::new()), "alice", -1.0)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_analyze_with_mock() {
    let db = setup_test_db();
    seed(&db, "alice");
    let mock = MockBackend::with_reply("1. Book trains early.");

    let outcome = commands::cmd_analyze(
        BackingStore::Sqlite(db),
        "alice",
        10000.0,
        Language::En,
        AIClient::Mock(mock.clone()),
    )
    .await
    .unwrap();

    assert_eq!(outcome, AnalysisOutcome::Advice("1. Book trains early.".into()));
    assert_eq!(mock.call_count(), 1);
    assert!(mock.prompts()[0].contains("Please respond in English."));
}

#[tokio::test]
async fn test_cmd_analyze_failure_is_localized() {
    let db = setup_test_db();
    seed(&db, "alice");
    let mock = MockBackend::failing(Some(503), "unavailable");

    let outcome = commands::cmd_analyze(
        BackingStore::Sqlite(db),
        "alice",
        10000.0,
        Language::Zh,
        AIClient::Mock(mock),
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        AnalysisOutcome::Failed("分析失败，请稍后重试。".into())
    );
}

#[tokio::test]
async fn test_cmd_analyze_without_expenses_makes_no_call() {
    let mock = MockBackend::new();
    let result = commands::cmd_analyze(
        BackingStore::Memory(MemoryBackend::new()),
        "alice",
        1000.0,
        Language::Auto,
        AIClient::Mock(mock.clone()),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(mock.call_count(), 0);
}

// ========== Core Command Tests ==========

#[test]
fn test_open_db_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");

    commands::cmd_init(&path, true).unwrap();
    let db = commands::open_db(&path, true).unwrap();
    db.insert_expense("alice", &NewExpense::new(ExpenseCategory::Other, 1.0, ""))
        .unwrap();

    // Reopening sees the same rows
    let reopened = commands::open_db(&path, true).unwrap();
    let page = reopened.list_expenses("alice", &ExpenseFilter::all()).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn test_open_backing_prefers_server() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unused.db");

    let backing =
        commands::open_backing(&path, true, Some("http://localhost:3000/")).unwrap();
    match backing {
        BackingStore::Remote(remote) => assert_eq!(remote.base_url(), "http://localhost:3000"),
        _ => panic!("expected remote backing store"),
    }
    assert!(!path.exists());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long description", 10), "a long ...");
    assert_eq!(truncate("北京烤鸭和炸酱面", 6), "北京烤...");
}
