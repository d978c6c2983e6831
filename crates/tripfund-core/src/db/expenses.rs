//! Expense operations
//!
//! Every query is scoped to an owner; one owner can never read or delete
//! another owner's rows.

use rusqlite::{params, params_from_iter, Row};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, Database};
use crate::error::Result;
use crate::models::{Expense, ExpenseCategory, ExpenseFilter, ExpensePage, NewExpense, SyncStatus};

const EXPENSE_COLUMNS: &str =
    "id, category, amount, currency, description, date, travel_plan_id";

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    let category_str: String = row.get(1)?;
    let date_str: String = row.get(5)?;

    Ok(Expense {
        id: row.get(0)?,
        category: category_str.parse().unwrap_or(ExpenseCategory::Other),
        amount: row.get(2)?,
        currency: row.get(3)?,
        description: row.get(4)?,
        date: parse_datetime(&date_str),
        travel_plan_id: row.get(6)?,
        sync_status: SyncStatus::Synced,
    })
}

impl Database {
    /// Insert a validated expense for `owner`, assigning a new id
    pub fn insert_expense(&self, owner: &str, expense: &NewExpense) -> Result<Expense> {
        let id = Uuid::new_v4().to_string();
        let stored = expense.clone().into_expense(id, SyncStatus::Synced);

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (id, owner, category, amount, currency, description, date, travel_plan_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                stored.id,
                owner,
                stored.category.as_str(),
                stored.amount,
                stored.currency,
                stored.description,
                format_datetime(&stored.date),
                stored.travel_plan_id,
            ],
        )?;

        Ok(stored)
    }

    /// Get one of `owner`'s expenses by id
    pub fn get_expense(&self, owner: &str, id: &str) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let expense = conn
            .query_row(
                &format!(
                    "SELECT {} FROM expenses WHERE id = ? AND owner = ?",
                    EXPENSE_COLUMNS
                ),
                params![id, owner],
                row_to_expense,
            )
            .ok();
        Ok(expense)
    }

    /// Delete one of `owner`'s expenses; false when no such row exists
    pub fn delete_expense(&self, owner: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM expenses WHERE id = ? AND owner = ?",
            params![id, owner],
        )?;
        Ok(deleted > 0)
    }

    /// List `owner`'s expenses, newest first
    ///
    /// `total` counts every matching row; `total_amount` sums the returned page.
    pub fn list_expenses(&self, owner: &str, filter: &ExpenseFilter) -> Result<ExpensePage> {
        let mut conditions = vec!["owner = ?"];
        let mut values: Vec<String> = vec![owner.to_string()];

        if let Some(ref plan) = filter.travel_plan_id {
            conditions.push("travel_plan_id = ?");
            values.push(plan.clone());
        }
        if let Some(category) = filter.category {
            conditions.push("category = ?");
            values.push(category.as_str().to_string());
        }
        let where_clause = conditions.join(" AND ");

        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM expenses WHERE {}", where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let limit = if filter.limit > 0 {
            filter.limit
        } else {
            ExpenseFilter::DEFAULT_LIMIT
        };
        let offset = filter.offset.max(0);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses WHERE {} ORDER BY date DESC, created_at DESC LIMIT {} OFFSET {}",
            EXPENSE_COLUMNS, where_clause, limit, offset
        ))?;
        let expenses = stmt
            .query_map(params_from_iter(values.iter()), row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total_amount = expenses.iter().map(|e| e.amount).sum();

        Ok(ExpensePage {
            expenses,
            total,
            total_amount,
        })
    }
}
