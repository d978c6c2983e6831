//! In-process backing store
//!
//! Used for offline sessions and tests. `set_failing(true)` makes every
//! call fail like an unreachable service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::ExpenseBackend;
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseFilter, ExpensePage, NewExpense, SyncStatus};

/// Backing store held in memory; clones share state
#[derive(Clone, Default)]
pub struct MemoryBackend {
    records: Arc<Mutex<HashMap<String, Vec<Expense>>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Copy of the owner's records in insertion order
    pub fn snapshot(&self, owner: &str) -> Vec<Expense> {
        self.records
            .lock()
            .map(|r| r.get(owner).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Sync("Memory backend unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Expense>>>> {
        self.records
            .lock()
            .map_err(|_| Error::Sync("Memory backend lock poisoned".into()))
    }
}

#[async_trait]
impl ExpenseBackend for MemoryBackend {
    async fn create(&self, owner: &str, expense: &NewExpense) -> Result<Expense> {
        self.check_available()?;
        let stored = expense
            .clone()
            .into_expense(Uuid::new_v4().to_string(), SyncStatus::Synced);
        self.lock()?
            .entry(owner.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<()> {
        self.check_available()?;
        let mut records = self.lock()?;
        let list = records.entry(owner.to_string()).or_default();
        let index = list
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("Expense {}", id)))?;
        list.remove(index);
        Ok(())
    }

    async fn list(&self, owner: &str, filter: &ExpenseFilter) -> Result<ExpensePage> {
        self.check_available()?;
        let records = self.lock()?;

        // Newest inserted first, so equal dates keep a stable order
        let mut matching: Vec<Expense> = records
            .get(owner)
            .map(|list| {
                list.iter()
                    .rev()
                    .filter(|e| {
                        filter.travel_plan_id.is_none() || e.travel_plan_id == filter.travel_plan_id
                    })
                    .filter(|e| filter.category.is_none() || filter.category == Some(e.category))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by(|a, b| b.date.cmp(&a.date));

        let total = matching.len() as i64;
        let limit = if filter.limit > 0 {
            filter.limit
        } else {
            ExpenseFilter::DEFAULT_LIMIT
        };
        let expenses: Vec<Expense> = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(limit as usize)
            .collect();
        let total_amount = expenses.iter().map(|e| e.amount).sum();

        Ok(ExpensePage {
            expenses,
            total,
            total_amount,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
