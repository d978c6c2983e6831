//! Budget analysis
//!
//! Aggregates the expenses, renders the analysis prompt and makes exactly
//! one completion call against the configured backend.

use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::ai::{AIBackend, AIClient};
use crate::budget::aggregate;
use crate::error::{Error, Result};
use crate::models::{Expense, Language};
use crate::prompts::{render_budget_prompt, PromptId, PromptLibrary};

/// Text returned when the provider answers without content
pub const ANALYSIS_FALLBACK: &str = "analysis failed";

/// Requests spending advice for a budget
#[derive(Clone)]
pub struct BudgetAnalyzer {
    ai: AIClient,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl BudgetAnalyzer {
    /// Create an analyzer using the default prompt library (overrides honoured)
    pub fn new(ai: AIClient) -> Self {
        Self::with_prompts(ai, PromptLibrary::new())
    }

    pub fn with_prompts(ai: AIClient, prompts: PromptLibrary) -> Self {
        Self {
            ai,
            prompts: Arc::new(RwLock::new(prompts)),
        }
    }

    pub fn client(&self) -> &AIClient {
        &self.ai
    }

    /// Analyze spending against `total_budget`
    ///
    /// Rejects an empty expense list or a negative budget before any network
    /// call. Provider failures are returned unchanged; there is no retry.
    pub async fn analyze(
        &self,
        total_budget: f64,
        expenses: &[Expense],
        language: Language,
    ) -> Result<String> {
        if !total_budget.is_finite() || total_budget < 0.0 {
            return Err(Error::Validation(
                "Total budget must be a non-negative number".into(),
            ));
        }
        if expenses.is_empty() {
            return Err(Error::Validation("No expenses to analyze".into()));
        }

        let snapshot = aggregate(total_budget, expenses);
        let (system, prompt) = {
            let mut prompts = self
                .prompts
                .write()
                .map_err(|_| Error::Config("Failed to acquire prompt library lock".into()))?;
            let template = prompts.get(PromptId::BudgetAnalysis)?;
            (
                template.system().to_string(),
                render_budget_prompt(template, &snapshot, expenses, language),
            )
        };

        info!(
            expense_count = expenses.len(),
            total_budget,
            model = %self.ai.model(),
            "Requesting budget analysis"
        );

        match self.ai.complete(&system, &prompt).await? {
            Some(text) => Ok(text),
            None => {
                warn!("Analysis returned no content");
                Ok(ANALYSIS_FALLBACK.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{ExpenseCategory, NewExpense, SyncStatus};

    fn expenses() -> Vec<Expense> {
        vec![
            NewExpense::new(ExpenseCategory::Food, 3000.0, "hotpot")
                .into_expense("1".into(), SyncStatus::LocalOnly),
            NewExpense::new(ExpenseCategory::Transport, 1500.0, "train")
                .into_expense("2".into(), SyncStatus::LocalOnly),
        ]
    }

    fn analyzer(mock: &MockBackend) -> BudgetAnalyzer {
        BudgetAnalyzer::with_prompts(AIClient::Mock(mock.clone()), PromptLibrary::embedded_only())
    }

    #[tokio::test]
    async fn test_analyze_returns_advice() {
        let mock = MockBackend::with_reply("Cut back on dining.");
        let result = analyzer(&mock)
            .analyze(10000.0, &expenses(), Language::En)
            .await
            .unwrap();

        assert_eq!(result, "Cut back on dining.");
        assert_eq!(mock.call_count(), 1);
        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("Please respond in English."));
        assert!(prompt.contains("food: ¥3000 (1 entries)"));
        assert!(prompt.contains("45.0%"));
    }

    #[tokio::test]
    async fn test_empty_content_falls_back() {
        let mock = MockBackend::empty();
        let result = analyzer(&mock)
            .analyze(10000.0, &expenses(), Language::Zh)
            .await
            .unwrap();
        assert_eq!(result, ANALYSIS_FALLBACK);
    }

    #[tokio::test]
    async fn test_empty_expenses_rejected_without_call() {
        let mock = MockBackend::new();
        let err = analyzer(&mock)
            .analyze(10000.0, &[], Language::Zh)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_negative_budget_rejected() {
        let mock = MockBackend::new();
        let err = analyzer(&mock)
            .analyze(-1.0, &expenses(), Language::Zh)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_analysis_error() {
        let server = crate::test_utils::MockLlmServer::start().await;
        let client = AIClient::OpenAICompatible(crate::ai::OpenAICompatibleBackend::new(
            crate::config::AnalysisConfig {
                host: server.url(),
                api_key: None,
                ..Default::default()
            },
        ));
        let analyzer = BudgetAnalyzer::with_prompts(client, PromptLibrary::embedded_only());

        let err = analyzer
            .analyze(10000.0, &expenses(), Language::En)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Analysis { status: None, .. }));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates_once() {
        let mock = MockBackend::failing(Some(500), "internal");
        let err = analyzer(&mock)
            .analyze(10000.0, &expenses(), Language::Zh)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Analysis { status: Some(500), .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_override_template_is_used() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("budget_analysis.md"),
            "---\nid: budget_analysis\nversion: 2\n---\n\n# System\n\nBe brief.\n\n# User\n\nSpent {{total_spent}} of {{total_budget}}\n",
        )
        .unwrap();

        let mock = MockBackend::new();
        let analyzer = BudgetAnalyzer::with_prompts(
            AIClient::Mock(mock.clone()),
            PromptLibrary::with_override_dir(dir.path().to_path_buf()),
        );
        analyzer
            .analyze(10000.0, &expenses(), Language::En)
            .await
            .unwrap();

        assert_eq!(mock.prompts()[0].trim(), "Spent ¥4500 of ¥10000");
    }
}
