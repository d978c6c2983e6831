//! Budget manager
//!
//! Drives one user session: composing and saving expenses, deleting them,
//! and requesting analysis. The manager is a single writer; every action
//! takes `&mut self`, so at most one network call is outstanding.
//!
//! ```text
//!   Idle ──begin_expense──▶ Editing ──confirm_expense──▶ Saving ──▶ Idle
//!    │  ◀──cancel_expense──────┘
//!    ├──delete_expense──▶ Saving ──▶ Idle
//!    └──request_analysis──▶ Analyzing ──▶ Idle
//! ```
//!
//! Every transition recomputes the [`BudgetSnapshot`]. Adding or deleting an
//! expense discards the previous analysis so stale advice is never shown
//! against new data.

use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::BudgetAnalyzer;
use crate::budget::{aggregate, BudgetSnapshot};
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseFilter, Language, NewExpense};
use crate::store::ExpenseStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    Idle,
    Editing,
    Saving,
    Analyzing,
}

impl ManagerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Analyzing => "analyzing",
        }
    }
}

impl std::fmt::Display for ManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of the last analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Advice text from the model
    Advice(String),
    /// Localized failure message for display
    Failed(String),
}

pub struct BudgetManager {
    state: ManagerState,
    store: ExpenseStore,
    analyzer: BudgetAnalyzer,
    total_budget: f64,
    language: Language,
    draft: Option<NewExpense>,
    snapshot: BudgetSnapshot,
    analysis: Option<AnalysisOutcome>,
}

impl BudgetManager {
    pub fn new(store: ExpenseStore, analyzer: BudgetAnalyzer, total_budget: f64) -> Self {
        let snapshot = aggregate(total_budget, store.list());
        Self {
            state: ManagerState::Idle,
            store,
            analyzer,
            total_budget,
            language: Language::Auto,
            draft: None,
            snapshot,
            analysis: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn snapshot(&self) -> &BudgetSnapshot {
        &self.snapshot
    }

    pub fn analysis(&self) -> Option<&AnalysisOutcome> {
        self.analysis.as_ref()
    }

    pub fn draft(&self) -> Option<&NewExpense> {
        self.draft.as_ref()
    }

    pub fn expenses(&self) -> &[Expense] {
        self.store.list()
    }

    pub fn store(&self) -> &ExpenseStore {
        &self.store
    }

    pub fn total_budget(&self) -> f64 {
        self.total_budget
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Change the total budget; the previous analysis no longer applies
    pub fn set_total_budget(&mut self, total_budget: f64) -> Result<()> {
        if !total_budget.is_finite() || total_budget < 0.0 {
            return Err(Error::Validation(
                "Total budget must be a non-negative number".into(),
            ));
        }
        self.total_budget = total_budget;
        self.analysis = None;
        self.transition(self.state);
        Ok(())
    }

    fn transition(&mut self, state: ManagerState) {
        self.state = state;
        self.snapshot = aggregate(self.total_budget, self.store.list());
    }

    fn require(&self, expected: ManagerState, action: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "Cannot {} while {}",
                action, self.state
            )))
        }
    }

    /// Idle → Editing
    pub fn begin_expense(&mut self, draft: NewExpense) -> Result<()> {
        self.require(ManagerState::Idle, "begin an expense")?;
        self.draft = Some(draft);
        self.transition(ManagerState::Editing);
        Ok(())
    }

    /// Replace the draft while Editing
    pub fn update_draft(&mut self, draft: NewExpense) -> Result<()> {
        self.require(ManagerState::Editing, "update the draft")?;
        self.draft = Some(draft);
        self.transition(ManagerState::Editing);
        Ok(())
    }

    /// Editing → Idle, discarding the draft
    pub fn cancel_expense(&mut self) -> Result<Option<NewExpense>> {
        self.require(ManagerState::Editing, "cancel an expense")?;
        let draft = self.draft.take();
        self.transition(ManagerState::Idle);
        Ok(draft)
    }

    /// Editing → Saving → Idle
    ///
    /// A sync failure still returns the locally kept expense. A validation
    /// failure returns to Editing with the draft intact.
    pub async fn confirm_expense(&mut self) -> Result<Expense> {
        self.require(ManagerState::Editing, "confirm an expense")?;
        let Some(draft) = self.draft.clone() else {
            return Err(Error::Validation("No expense draft to save".into()));
        };

        self.transition(ManagerState::Saving);
        match self.store.add(draft).await {
            Ok(expense) => {
                self.draft = None;
                self.analysis = None;
                self.transition(ManagerState::Idle);
                info!(id = %expense.id, sync_status = %expense.sync_status, "Expense added");
                Ok(expense)
            }
            Err(e) => {
                self.transition(ManagerState::Editing);
                Err(e)
            }
        }
    }

    /// Idle → Saving → Idle; unknown ids are a no-op
    pub async fn delete_expense(&mut self, id: &str) -> Result<Option<Expense>> {
        self.require(ManagerState::Idle, "delete an expense")?;

        self.transition(ManagerState::Saving);
        let result = self.store.remove(id).await;
        if matches!(result, Ok(Some(_))) {
            self.analysis = None;
        }
        self.transition(ManagerState::Idle);
        result
    }

    /// Idle → Analyzing → Idle
    ///
    /// Rejected before any network call when there are no expenses. An
    /// upstream failure is recorded as [`AnalysisOutcome::Failed`], not
    /// returned as an error; expenses are never discarded.
    pub async fn request_analysis(&mut self) -> Result<AnalysisOutcome> {
        self.require(ManagerState::Idle, "request analysis")?;
        if self.store.is_empty() {
            return Err(Error::Validation(
                "Add at least one expense before requesting analysis".into(),
            ));
        }

        self.transition(ManagerState::Analyzing);
        let outcome = match self
            .analyzer
            .analyze(self.total_budget, self.store.list(), self.language)
            .await
        {
            Ok(text) => AnalysisOutcome::Advice(text),
            Err(e) => {
                warn!(error = %e, "Budget analysis failed");
                let language = self
                    .language
                    .resolve(self.store.list().iter().map(|x| x.description.as_str()));
                AnalysisOutcome::Failed(language.analysis_failed_message().to_string())
            }
        };

        self.analysis = Some(outcome.clone());
        self.transition(ManagerState::Idle);
        Ok(outcome)
    }

    /// Load the owner's persisted expenses (Idle → Saving → Idle)
    pub async fn load(&mut self) -> Result<usize> {
        self.require(ManagerState::Idle, "load expenses")?;

        self.transition(ManagerState::Saving);
        let result = self.store.load(&ExpenseFilter::all()).await;
        if result.is_ok() {
            self.analysis = None;
        }
        self.transition(ManagerState::Idle);
        result
    }

    /// Retry syncing records whose backing-store write failed
    pub async fn retry_sync(&mut self) -> Result<usize> {
        self.require(ManagerState::Idle, "retry sync")?;

        self.transition(ManagerState::Saving);
        let synced = self.store.retry_failed().await;
        self.transition(ManagerState::Idle);
        Ok(synced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIClient, MockBackend};
    use crate::models::{ExpenseCategory, SyncStatus};
    use crate::prompts::PromptLibrary;
    use crate::store::{BackingStore, MemoryBackend};

    fn manager_with(mock: &MockBackend, store: ExpenseStore, budget: f64) -> BudgetManager {
        let analyzer =
            BudgetAnalyzer::with_prompts(AIClient::Mock(mock.clone()), PromptLibrary::embedded_only());
        BudgetManager::new(store, analyzer, budget)
    }

    async fn add(manager: &mut BudgetManager, category: ExpenseCategory, amount: f64) -> Expense {
        manager
            .begin_expense(NewExpense::new(category, amount, "item"))
            .unwrap();
        manager.confirm_expense().await.unwrap()
    }

    #[tokio::test]
    async fn test_add_flow_updates_snapshot() {
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, ExpenseStore::local(), 10000.0);
        assert_eq!(manager.state(), ManagerState::Idle);

        manager
            .begin_expense(NewExpense::new(ExpenseCategory::Food, 1.0, ""))
            .unwrap();
        assert_eq!(manager.state(), ManagerState::Editing);
        manager
            .update_draft(NewExpense::new(ExpenseCategory::Food, 3000.0, "hotpot"))
            .unwrap();
        manager.confirm_expense().await.unwrap();
        add(&mut manager, ExpenseCategory::Transport, 1500.0).await;

        assert_eq!(manager.state(), ManagerState::Idle);
        assert!(manager.draft().is_none());
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.total_spent, 4500.0);
        assert_eq!(snapshot.remaining, 5500.0);
        assert_eq!(snapshot.spent_percentage, Some(45.0));
    }

    #[tokio::test]
    async fn test_cancel_discards_draft() {
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, ExpenseStore::local(), 100.0);
        manager
            .begin_expense(NewExpense::new(ExpenseCategory::Food, 5.0, ""))
            .unwrap();

        let draft = manager.cancel_expense().unwrap().unwrap();
        assert_eq!(draft.amount, 5.0);
        assert_eq!(manager.state(), ManagerState::Idle);
        assert!(manager.expenses().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_draft_stays_editing() {
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, ExpenseStore::local(), 100.0);
        manager
            .begin_expense(NewExpense::new(ExpenseCategory::Food, 0.0, ""))
            .unwrap();

        let err = manager.confirm_expense().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(manager.state(), ManagerState::Editing);
        assert_eq!(manager.draft().unwrap().amount, 0.0);
    }

    #[tokio::test]
    async fn test_wrong_state_is_rejected() {
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, ExpenseStore::local(), 100.0);

        assert!(matches!(
            manager.confirm_expense().await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(manager.cancel_expense(), Err(Error::InvalidState(_))));

        manager
            .begin_expense(NewExpense::new(ExpenseCategory::Food, 5.0, ""))
            .unwrap();
        assert!(matches!(
            manager.begin_expense(NewExpense::new(ExpenseCategory::Food, 6.0, "")),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            manager.delete_expense("x").await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            manager.request_analysis().await,
            Err(Error::InvalidState(_))
        ));
        assert_eq!(manager.state(), ManagerState::Editing);
    }

    #[tokio::test]
    async fn test_delete_reduces_total_and_is_idempotent() {
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, ExpenseStore::local(), 1000.0);
        let food = add(&mut manager, ExpenseCategory::Food, 300.0).await;
        add(&mut manager, ExpenseCategory::Shopping, 200.0).await;

        let removed = manager.delete_expense(&food.id).await.unwrap();
        assert_eq!(removed.unwrap().id, food.id);
        assert_eq!(manager.snapshot().total_spent, 200.0);

        assert!(manager.delete_expense(&food.id).await.unwrap().is_none());
        assert_eq!(manager.snapshot().total_spent, 200.0);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[tokio::test]
    async fn test_analysis_rejected_without_expenses() {
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, ExpenseStore::local(), 1000.0);

        let err = manager.request_analysis().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(mock.call_count(), 0);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[tokio::test]
    async fn test_analysis_success_then_cleared_by_add() {
        let mock = MockBackend::with_reply("Looks fine.");
        let mut manager = manager_with(&mock, ExpenseStore::local(), 1000.0);
        add(&mut manager, ExpenseCategory::Food, 100.0).await;

        let outcome = manager.request_analysis().await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Advice("Looks fine.".into()));
        assert_eq!(manager.analysis(), Some(&outcome));
        assert_eq!(manager.state(), ManagerState::Idle);

        add(&mut manager, ExpenseCategory::Food, 50.0).await;
        assert!(manager.analysis().is_none());
    }

    #[tokio::test]
    async fn test_analysis_failure_keeps_expenses() {
        let mock = MockBackend::failing(Some(502), "bad gateway");
        let mut manager = manager_with(&mock, ExpenseStore::local(), 1000.0)
            .with_language(Language::En);
        add(&mut manager, ExpenseCategory::Food, 100.0).await;

        let outcome = manager.request_analysis().await.unwrap();
        assert_eq!(
            outcome,
            AnalysisOutcome::Failed("Analysis failed, please try again later.".into())
        );
        assert_eq!(manager.state(), ManagerState::Idle);
        assert_eq!(manager.expenses().len(), 1);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_message_defaults_to_primary_language() {
        let mock = MockBackend::failing(None, "down");
        let mut manager = manager_with(&mock, ExpenseStore::local(), 1000.0);
        add(&mut manager, ExpenseCategory::Food, 100.0).await;

        let outcome = manager.request_analysis().await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Failed("分析失败，请稍后重试。".into()));
    }

    #[tokio::test]
    async fn test_sync_failure_is_not_fatal() {
        let backend = MemoryBackend::new();
        backend.set_failing(true);
        let store = ExpenseStore::new(
            Some(BackingStore::Memory(backend.clone())),
            Some("alice".into()),
        );
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, store, 500.0);

        let expense = add(&mut manager, ExpenseCategory::Activity, 120.0).await;
        assert_eq!(expense.sync_status, SyncStatus::Failed);
        assert_eq!(manager.state(), ManagerState::Idle);
        assert_eq!(manager.snapshot().total_spent, 120.0);

        backend.set_failing(false);
        assert_eq!(manager.retry_sync().await.unwrap(), 1);
        assert_eq!(manager.expenses()[0].sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_load_totals_more_than_one_page() {
        let backend = MemoryBackend::new();
        let mut writer = ExpenseStore::new(
            Some(BackingStore::Memory(backend.clone())),
            Some("alice".into()),
        );
        for _ in 0..101 {
            writer
                .add(NewExpense::new(ExpenseCategory::Transport, 10.0, "bus"))
                .await
                .unwrap();
        }

        let store = ExpenseStore::new(Some(BackingStore::Memory(backend)), Some("alice".into()));
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, store, 2000.0);

        assert_eq!(manager.load().await.unwrap(), 101);
        assert_eq!(manager.snapshot().expense_count, 101);
        assert_eq!(manager.snapshot().total_spent, 1010.0);
        assert_eq!(manager.state(), ManagerState::Idle);
    }

    #[tokio::test]
    async fn test_set_total_budget_recomputes() {
        let mock = MockBackend::new();
        let mut manager = manager_with(&mock, ExpenseStore::local(), 0.0);
        add(&mut manager, ExpenseCategory::Food, 40.0).await;
        assert_eq!(manager.snapshot().spent_percentage, None);

        manager.set_total_budget(200.0).unwrap();
        assert_eq!(manager.snapshot().spent_percentage, Some(20.0));
        assert!(manager.set_total_budget(-1.0).is_err());
    }
}
