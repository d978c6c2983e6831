//! Budget aggregation
//!
//! A [`BudgetSnapshot`] is derived from the current expense set every time it
//! is needed and never stored on its own, so it cannot drift from the
//! expenses it describes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Expense, ExpenseCategory};

/// Spend above this percentage of the budget is a warning
pub const WARNING_PERCENTAGE: f64 = 80.0;

/// Count and sum of expenses in one category
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub count: usize,
    pub sum: f64,
}

/// Where spending stands relative to the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// At or below the warning threshold
    OnTrack,
    /// Above the warning threshold, not over budget
    Warning,
    /// More than 100% of the budget spent
    Overspent,
    /// No budget set, so no percentage exists
    Unknown,
}

/// Derived view of a budget against its expenses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub total_budget: f64,
    pub total_spent: f64,
    /// `total_budget - total_spent`; negative when overspent
    pub remaining: f64,
    /// `None` when the budget is zero
    pub spent_percentage: Option<f64>,
    pub category_breakdown: BTreeMap<ExpenseCategory, CategoryTotals>,
    pub expense_count: usize,
}

impl BudgetSnapshot {
    /// True precisely when more than the whole budget is spent
    pub fn is_overspent(&self) -> bool {
        self.spent_percentage.is_some_and(|p| p > 100.0)
    }

    pub fn status(&self) -> BudgetStatus {
        match self.spent_percentage {
            None => BudgetStatus::Unknown,
            Some(p) if p > 100.0 => BudgetStatus::Overspent,
            Some(p) if p > WARNING_PERCENTAGE => BudgetStatus::Warning,
            Some(_) => BudgetStatus::OnTrack,
        }
    }

    /// Spent percentage formatted for display (one decimal, or "N/A")
    pub fn percentage_display(&self) -> String {
        match self.spent_percentage {
            Some(p) => format!("{:.1}%", p),
            None => "N/A".to_string(),
        }
    }
}

/// Aggregate expenses against a total budget
pub fn aggregate(total_budget: f64, expenses: &[Expense]) -> BudgetSnapshot {
    let mut category_breakdown: BTreeMap<ExpenseCategory, CategoryTotals> = BTreeMap::new();
    let mut total_spent = 0.0;

    for expense in expenses {
        total_spent += expense.amount;
        let totals = category_breakdown.entry(expense.category).or_default();
        totals.count += 1;
        totals.sum += expense.amount;
    }

    let spent_percentage = if total_budget > 0.0 {
        Some(total_spent * 100.0 / total_budget)
    } else {
        None
    };

    BudgetSnapshot {
        total_budget,
        total_spent,
        remaining: total_budget - total_spent,
        spent_percentage,
        category_breakdown,
        expense_count: expenses.len(),
    }
}
