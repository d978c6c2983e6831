//! Expense command implementations

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use tripfund_core::db::Database;
use tripfund_core::models::{currency_symbol, Expense, ExpenseCategory, ExpenseFilter, NewExpense};

use super::truncate;

/// Build a validated expense from command-line values
pub fn build_expense(
    category: ExpenseCategory,
    amount: f64,
    description: &str,
    currency: &str,
    date: Option<&str>,
    plan: Option<String>,
) -> Result<NewExpense> {
    let date = match date {
        Some(d) => {
            let day = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", d))?;
            let midnight = day
                .and_hms_opt(0, 0, 0)
                .context("Invalid date")?;
            Some(Utc.from_utc_datetime(&midnight))
        }
        None => None,
    };

    let expense = NewExpense {
        currency: currency.to_string(),
        date,
        travel_plan_id: plan,
        ..NewExpense::new(category, amount, description)
    };
    Ok(expense.validate()?)
}

pub fn cmd_expenses_list(
    db: &Database,
    owner: &str,
    limit: i64,
    category: Option<ExpenseCategory>,
    plan: Option<String>,
) -> Result<()> {
    let filter = ExpenseFilter {
        travel_plan_id: plan,
        category,
        limit,
        offset: 0,
    };
    let page = db.list_expenses(owner, &filter)?;

    if page.expenses.is_empty() {
        println!("No expenses found. Record one with:");
        println!("  tripfund expenses --user {} add food 88 dumplings", owner);
        return Ok(());
    }

    println!();
    println!("🧾 Expenses ({} of {})", page.expenses.len(), page.total);
    println!("   ─────────────────────────────────────────────────────────────");

    for expense in &page.expenses {
        println!(
            "   {} │ {:<13} │ {:>10} │ {}  [{}]",
            expense.date.format("%Y-%m-%d"),
            expense.category,
            format!(
                "{}{:.2}",
                currency_symbol(&expense.currency),
                expense.amount
            ),
            truncate(&expense.description, 30),
            expense.id
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Page total: {:.2}", page.total_amount);

    Ok(())
}

pub fn cmd_expenses_add(db: &Database, owner: &str, expense: NewExpense) -> Result<Expense> {
    let stored = db
        .insert_expense(owner, &expense)
        .context("Failed to record expense")?;

    println!(
        "✅ Recorded {} {}{:.2} ({})",
        stored.category,
        currency_symbol(&stored.currency),
        stored.amount,
        stored.id
    );

    Ok(stored)
}

pub fn cmd_expenses_delete(db: &Database, owner: &str, id: &str) -> Result<()> {
    if !db.delete_expense(owner, id)? {
        anyhow::bail!("Expense {} not found", id);
    }
    println!("🗑️  Deleted expense {}", id);
    Ok(())
}
