//! Expense handlers
//!
//! Every endpoint is scoped to the owner named by the auth provider.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{require_owner, AppError, AppState, MAX_PAGE_LIMIT};
use tripfund_core::models::{Expense, ExpenseCategory, ExpenseFilter, NewExpense};

/// Query parameters for listing expenses
#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    #[serde(alias = "travelPlanId")]
    pub travel_plan_id: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: i64,
}

fn default_limit() -> i64 {
    ExpenseFilter::DEFAULT_LIMIT
}

#[derive(Debug, Serialize)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
    pub total: i64,
    pub total_amount: f64,
    pub limit: i64,
    pub skip: i64,
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub expense: Expense,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// GET /api/expenses - List the caller's expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExpenseQuery>,
    request: Request,
) -> Result<Json<ExpenseListResponse>, AppError> {
    let owner = require_owner(request.headers())?;

    let category = params
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| {
            c.parse::<ExpenseCategory>()
                .map_err(|_| AppError::bad_request(&format!("Unknown category: {}", c)))
        })
        .transpose()?;

    let limit = if params.limit <= 0 {
        ExpenseFilter::DEFAULT_LIMIT
    } else {
        params.limit.min(MAX_PAGE_LIMIT)
    };
    let skip = params.skip.max(0);

    let filter = ExpenseFilter {
        travel_plan_id: params.travel_plan_id,
        category,
        limit,
        offset: skip,
    };
    let page = state.db.list_expenses(&owner, &filter)?;

    Ok(Json(ExpenseListResponse {
        expenses: page.expenses,
        total: page.total,
        total_amount: page.total_amount,
        limit,
        skip,
    }))
}

/// POST /api/expenses - Record a new expense
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<ExpenseResponse>), AppError> {
    let owner = require_owner(request.headers())?;

    // Extract JSON body
    let bytes = axum::body::to_bytes(request.into_body(), 1024 * 10)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: NewExpense =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;
    let req = req.validate()?;

    let expense = state.db.insert_expense(&owner, &req)?;
    info!(user = %owner, id = %expense.id, category = %expense.category, "Expense created");

    Ok((StatusCode::CREATED, Json(ExpenseResponse { expense })))
}

/// DELETE /api/expenses/:id - Delete one of the caller's expenses
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<DeletedResponse>, AppError> {
    let owner = require_owner(request.headers())?;

    if !state.db.delete_expense(&owner, &id)? {
        return Err(AppError::not_found(&format!("Expense {} not found", id)));
    }
    info!(user = %owner, id = %id, "Expense deleted");

    Ok(Json(DeletedResponse { deleted: true }))
}
