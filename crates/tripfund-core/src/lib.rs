//! Tripfund Core Library
//!
//! Shared functionality for the Tripfund travel budget assistant:
//! - Expense store with swappable backing stores (SQLite, HTTP, memory)
//! - Budget aggregation into derived snapshots
//! - Prompt library for the budget analysis prompt
//! - Pluggable text-generation backends and the budget analyzer
//! - Budget manager driving one user session

pub mod ai;
pub mod analysis;
pub mod budget;
pub mod config;
pub mod db;
pub mod error;
pub mod manager;
pub mod models;
pub mod prompts;
pub mod store;

/// Test utilities including a mock chat completions server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, MockBackend, MockReply, OpenAICompatibleBackend};
pub use analysis::{BudgetAnalyzer, ANALYSIS_FALLBACK};
pub use budget::{aggregate, BudgetSnapshot, BudgetStatus, CategoryTotals};
pub use config::AnalysisConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use manager::{AnalysisOutcome, BudgetManager, ManagerState};
pub use models::{
    detect_language, Expense, ExpenseCategory, ExpenseFilter, ExpensePage, Language, NewExpense,
    SyncStatus,
};
pub use prompts::{build_prompt, Prompt, PromptId, PromptLibrary, SYSTEM_PROMPT};
pub use store::{
    BackingStore, ExpenseBackend, ExpenseStore, MemoryBackend, RemoteBackend, OWNER_HEADER,
};
