//! Budget snapshot and analysis handlers

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{require_owner, AppError, AppState};
use tripfund_core::budget::{aggregate, BudgetSnapshot, BudgetStatus};
use tripfund_core::models::{
    Expense, ExpenseCategory, ExpenseFilter, Language, NewExpense, SyncStatus,
};

#[derive(Debug, Deserialize)]
pub struct BudgetQuery {
    #[serde(default)]
    pub total_budget: f64,
    #[serde(alias = "travelPlanId")]
    pub travel_plan_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    #[serde(flatten)]
    pub snapshot: BudgetSnapshot,
    pub status: BudgetStatus,
}

/// GET /api/budget - Snapshot of all the caller's stored expenses
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BudgetQuery>,
    request: Request,
) -> Result<Json<BudgetResponse>, AppError> {
    let owner = require_owner(request.headers())?;

    if !params.total_budget.is_finite() || params.total_budget < 0.0 {
        return Err(AppError::bad_request(
            "Total budget must be a non-negative number",
        ));
    }

    let filter = ExpenseFilter {
        travel_plan_id: params.travel_plan_id,
        limit: i64::MAX,
        ..Default::default()
    };
    let page = state.db.list_expenses(&owner, &filter)?;
    let snapshot = aggregate(params.total_budget, &page.expenses);
    let status = snapshot.status();

    Ok(Json(BudgetResponse { snapshot, status }))
}

/// One expense as submitted for analysis
#[derive(Debug, Deserialize)]
pub struct AnalysisExpense {
    #[serde(default)]
    pub id: Option<String>,
    pub category: ExpenseCategory,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub total_budget: f64,
    pub expenses: Vec<AnalysisExpense>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

impl AnalysisExpense {
    fn into_expense(self, index: usize) -> Result<Expense, AppError> {
        let new = NewExpense {
            date: self.date,
            ..NewExpense::new(self.category, self.amount, &self.description)
        }
        .validate()?;
        let id = self.id.unwrap_or_else(|| format!("expense-{}", index + 1));
        Ok(new.into_expense(id, SyncStatus::LocalOnly))
    }
}

/// POST /api/budget-analysis - Generate spending advice for a budget
///
/// The submitted expenses are analyzed as-is; nothing is stored.
pub async fn analyze_budget(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<AnalysisResponse>, AppError> {
    if !state.analyzer.client().has_credentials() {
        return Err(AppError::internal("No API-key provided."));
    }

    // Extract JSON body
    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 256)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: AnalysisRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let expenses = req
        .expenses
        .into_iter()
        .enumerate()
        .map(|(i, e)| e.into_expense(i))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        expense_count = expenses.len(),
        language = %req.language,
        "Budget analysis requested"
    );
    let analysis = state
        .analyzer
        .analyze(req.total_budget, &expenses, req.language)
        .await?;

    Ok(Json(AnalysisResponse { analysis }))
}
