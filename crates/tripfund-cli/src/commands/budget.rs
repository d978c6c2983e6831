//! Budget snapshot and analysis commands

use anyhow::{Context, Result};
use tripfund_core::ai::AIClient;
use tripfund_core::budget::{aggregate, BudgetSnapshot, BudgetStatus};
use tripfund_core::models::{ExpenseFilter, Language};
use tripfund_core::store::{BackingStore, ExpenseStore};
use tripfund_core::{AnalysisOutcome, BudgetAnalyzer, BudgetManager};

fn print_snapshot(snapshot: &BudgetSnapshot) {
    println!();
    println!("💰 Budget Summary");
    println!("   ─────────────────────────────────────────────");
    println!("   Budget:     {:>12.2}", snapshot.total_budget);
    println!("   Spent:      {:>12.2}", snapshot.total_spent);
    println!("   Remaining:  {:>12.2}", snapshot.remaining);
    println!("   Used:       {:>12}", snapshot.percentage_display());
    println!("   Expenses:   {:>12}", snapshot.expense_count);

    if !snapshot.category_breakdown.is_empty() {
        println!();
        println!("   By category:");
        for (category, totals) in &snapshot.category_breakdown {
            println!(
                "     {:<13} {:>12.2}  ({} entries)",
                category.as_str(),
                totals.sum,
                totals.count
            );
        }
    }

    println!();
    match snapshot.status() {
        BudgetStatus::Overspent => println!("   🚨 Over budget by {:.2}", -snapshot.remaining),
        BudgetStatus::Warning => println!("   ⚠️  More than 80% of the budget is spent"),
        BudgetStatus::OnTrack => println!("   ✅ Spending is on track"),
        BudgetStatus::Unknown => println!("   ℹ️  No budget set"),
    }
}

/// Load the owner's expenses and show the derived snapshot
pub async fn cmd_summary(
    backing: BackingStore,
    owner: &str,
    total_budget: f64,
) -> Result<BudgetSnapshot> {
    if !total_budget.is_finite() || total_budget < 0.0 {
        anyhow::bail!("Budget must be a non-negative number");
    }

    let mut store = ExpenseStore::new(Some(backing), Some(owner.to_string()));
    store
        .load(&ExpenseFilter::all())
        .await
        .context("Failed to load expenses")?;

    let snapshot = aggregate(total_budget, store.list());
    print_snapshot(&snapshot);
    Ok(snapshot)
}

/// Load the owner's expenses and request spending advice
pub async fn cmd_analyze(
    backing: BackingStore,
    owner: &str,
    total_budget: f64,
    language: Language,
    ai: AIClient,
) -> Result<AnalysisOutcome> {
    if !total_budget.is_finite() || total_budget < 0.0 {
        anyhow::bail!("Budget must be a non-negative number");
    }

    let store = ExpenseStore::new(Some(backing), Some(owner.to_string()));
    let mut manager = BudgetManager::new(store, BudgetAnalyzer::new(ai), total_budget)
        .with_language(language);

    manager.load().await.context("Failed to load expenses")?;
    if manager.expenses().is_empty() {
        anyhow::bail!("No expenses recorded for {}; nothing to analyze", owner);
    }

    print_snapshot(manager.snapshot());

    println!();
    println!("🤖 Requesting spending advice...");
    let outcome = manager
        .request_analysis()
        .await
        .context("Analysis request failed")?;

    println!();
    match &outcome {
        AnalysisOutcome::Advice(text) => {
            for line in text.lines() {
                println!("   {}", line);
            }
        }
        AnalysisOutcome::Failed(message) => println!("   ❌ {}", message),
    }

    Ok(outcome)
}
