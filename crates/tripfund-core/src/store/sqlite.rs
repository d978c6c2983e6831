//! SQLite backing store

use async_trait::async_trait;

use super::ExpenseBackend;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseFilter, ExpensePage, NewExpense};

#[async_trait]
impl ExpenseBackend for Database {
    async fn create(&self, owner: &str, expense: &NewExpense) -> Result<Expense> {
        self.insert_expense(owner, expense)
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<()> {
        if self.delete_expense(owner, id)? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Expense {}", id)))
        }
    }

    async fn list(&self, owner: &str, filter: &ExpenseFilter) -> Result<ExpensePage> {
        self.list_expenses(owner, filter)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
