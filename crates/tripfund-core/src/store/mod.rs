//! Expense store
//!
//! The session's authoritative expense list. When an owner and a backing
//! store are present, writes are mirrored to the backing store; a failed
//! mirror never loses the local record.
//!
//! # Architecture
//!
//! - `ExpenseBackend` trait: create/delete/list against durable storage
//! - `BackingStore` enum: compile-time dispatch over the adapters
//! - Adapters: `Database` (SQLite), `RemoteBackend` (HTTP), `MemoryBackend`

mod memory;
mod remote;
mod sqlite;

pub use memory::MemoryBackend;
pub use remote::{RemoteBackend, OWNER_HEADER};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseFilter, ExpensePage, NewExpense, SyncStatus};

/// Durable storage for an owner's expenses
#[async_trait]
pub trait ExpenseBackend: Send + Sync {
    /// Persist an expense and return it with the backing-store id
    async fn create(&self, owner: &str, expense: &NewExpense) -> Result<Expense>;

    /// Delete an expense; `Error::NotFound` when the owner has no such record
    async fn delete(&self, owner: &str, id: &str) -> Result<()>;

    /// List the owner's expenses, newest first
    async fn list(&self, owner: &str, filter: &ExpenseFilter) -> Result<ExpensePage>;

    /// Short adapter name (for logging)
    fn name(&self) -> &'static str;
}

/// Concrete backing store enum
#[derive(Clone)]
pub enum BackingStore {
    Sqlite(Database),
    Remote(RemoteBackend),
    Memory(MemoryBackend),
}

#[async_trait]
impl ExpenseBackend for BackingStore {
    async fn create(&self, owner: &str, expense: &NewExpense) -> Result<Expense> {
        match self {
            BackingStore::Sqlite(b) => b.create(owner, expense).await,
            BackingStore::Remote(b) => b.create(owner, expense).await,
            BackingStore::Memory(b) => b.create(owner, expense).await,
        }
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<()> {
        match self {
            BackingStore::Sqlite(b) => b.delete(owner, id).await,
            BackingStore::Remote(b) => b.delete(owner, id).await,
            BackingStore::Memory(b) => b.delete(owner, id).await,
        }
    }

    async fn list(&self, owner: &str, filter: &ExpenseFilter) -> Result<ExpensePage> {
        match self {
            BackingStore::Sqlite(b) => b.list(owner, filter).await,
            BackingStore::Remote(b) => b.list(owner, filter).await,
            BackingStore::Memory(b) => b.list(owner, filter).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BackingStore::Sqlite(b) => b.name(),
            BackingStore::Remote(b) => b.name(),
            BackingStore::Memory(b) => b.name(),
        }
    }
}

/// Session-held expense collection, in insertion order
pub struct ExpenseStore {
    expenses: Vec<Expense>,
    backing: Option<BackingStore>,
    owner: Option<String>,
}

impl ExpenseStore {
    pub fn new(backing: Option<BackingStore>, owner: Option<String>) -> Self {
        Self {
            expenses: Vec::new(),
            backing,
            owner,
        }
    }

    /// A store with no account and no backing store
    pub fn local() -> Self {
        Self::new(None, None)
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn backing(&self) -> Option<&BackingStore> {
        self.backing.as_ref()
    }

    fn sync_target(&self) -> Option<(&BackingStore, &str)> {
        Some((self.backing.as_ref()?, self.owner.as_deref()?))
    }

    /// Validate and append an expense, mirroring it when an account is present
    ///
    /// The record is held as `Pending` while the backing-store write is in
    /// flight, so an add whose future is dropped leaves it `Pending` for
    /// [`retry_failed`](Self::retry_failed). A backing-store failure marks the
    /// record `Failed` but still succeeds.
    pub async fn add(&mut self, new: NewExpense) -> Result<Expense> {
        let new = new.validate()?;
        if new.amount <= 0.0 {
            return Err(Error::Validation(
                "Amount must be greater than zero".into(),
            ));
        }

        let mut expense = new
            .clone()
            .into_expense(Uuid::new_v4().to_string(), SyncStatus::LocalOnly);

        let Some((backing, owner)) = self
            .sync_target()
            .map(|(backing, owner)| (backing.clone(), owner.to_string()))
        else {
            self.expenses.push(expense.clone());
            return Ok(expense);
        };

        expense.sync_status = SyncStatus::Pending;
        self.expenses.push(expense.clone());
        let index = self.expenses.len() - 1;

        // The backing store sees the same timestamp as the local copy
        let mut outgoing = new;
        outgoing.date = Some(expense.date);

        match backing.create(&owner, &outgoing).await {
            Ok(remote) => {
                debug!(local_id = %expense.id, remote_id = %remote.id, backend = backing.name(), "Expense synced");
                expense.id = remote.id;
                expense.sync_status = SyncStatus::Synced;
            }
            Err(e) => {
                warn!(id = %expense.id, backend = backing.name(), error = %e, "Failed to sync expense, keeping local copy");
                expense.sync_status = SyncStatus::Failed;
            }
        }

        self.expenses[index] = expense.clone();
        Ok(expense)
    }

    /// Remove an expense by id; unknown ids are a no-op
    ///
    /// Synced records are also deleted from the backing store. A failed
    /// backing delete is logged and otherwise ignored.
    pub async fn remove(&mut self, id: &str) -> Result<Option<Expense>> {
        let Some(index) = self.expenses.iter().position(|e| e.id == id) else {
            return Ok(None);
        };
        let removed = self.expenses.remove(index);

        if removed.sync_status == SyncStatus::Synced {
            if let Some((backing, owner)) = self.sync_target() {
                if let Err(e) = backing.delete(owner, &removed.id).await {
                    warn!(id = %removed.id, backend = backing.name(), error = %e, "Failed to delete expense from backing store");
                }
            }
        }

        Ok(Some(removed))
    }

    /// Current expenses in insertion order
    pub fn list(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn get(&self, id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    /// Replace synced records with the owner's persisted expenses
    ///
    /// Every page matching `filter` is fetched, starting at `filter.offset`
    /// and using `filter.limit` as the page size. Records that never reached
    /// the backing store are kept after the loaded ones. Returns the number
    /// of records loaded.
    pub async fn load(&mut self, filter: &ExpenseFilter) -> Result<usize> {
        let owner = self
            .owner
            .as_deref()
            .ok_or_else(|| Error::Auth("Loading expenses requires an account".into()))?;
        let backing = self
            .backing
            .as_ref()
            .ok_or_else(|| Error::Config("No backing store configured".into()))?;

        // Page through until the reported total is reached
        let mut page_filter = filter.clone();
        if page_filter.limit <= 0 {
            page_filter.limit = ExpenseFilter::DEFAULT_LIMIT;
        }
        page_filter.offset = page_filter.offset.max(0);
        let mut fetched: Vec<Expense> = Vec::new();
        loop {
            let page = backing.list(owner, &page_filter).await?;
            if page.expenses.is_empty() {
                break;
            }
            page_filter.offset += page.expenses.len() as i64;
            fetched.extend(page.expenses);
            if page_filter.offset >= page.total {
                break;
            }
            debug!(owner, fetched = fetched.len(), total = page.total, "Fetching next page");
        }
        let loaded = fetched.len();

        // Backing stores list newest first; the session keeps oldest first
        let mut expenses: Vec<Expense> = fetched.into_iter().rev().collect();
        expenses.extend(
            self.expenses
                .drain(..)
                .filter(|e| e.sync_status != SyncStatus::Synced),
        );
        self.expenses = expenses;

        info!(owner, loaded, backend = backing.name(), "Loaded expenses");
        Ok(loaded)
    }

    /// Re-issue creates for records whose sync failed or never completed
    ///
    /// Returns how many records are now synced.
    pub async fn retry_failed(&mut self) -> usize {
        let (Some(backing), Some(owner)) = (self.backing.as_ref(), self.owner.as_deref()) else {
            return 0;
        };

        let mut synced = 0;
        for expense in self
            .expenses
            .iter_mut()
            .filter(|e| matches!(e.sync_status, SyncStatus::Failed | SyncStatus::Pending))
        {
            match backing.create(owner, &NewExpense::from(&*expense)).await {
                Ok(remote) => {
                    expense.id = remote.id;
                    expense.sync_status = SyncStatus::Synced;
                    synced += 1;
                }
                Err(e) => {
                    warn!(id = %expense.id, error = %e, "Retry sync failed");
                }
            }
        }
        synced
    }
}
