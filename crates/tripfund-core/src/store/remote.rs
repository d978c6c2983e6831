//! HTTP backing store
//!
//! Talks to a tripfund server's `/api/expenses` resource. The owner is sent
//! in [`OWNER_HEADER`], the way a fronting auth proxy would set it.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::ExpenseBackend;
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseFilter, ExpensePage, NewExpense, SyncStatus};

/// Header carrying the authenticated owner id
pub const OWNER_HEADER: &str = "x-tripfund-user";

#[derive(Clone)]
pub struct RemoteBackend {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CreatedExpense {
    expense: Expense,
}

impl RemoteBackend {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, builder: RequestBuilder, owner: &str) -> RequestBuilder {
        let builder = builder.header(OWNER_HEADER, owner);
        match self.api_key {
            Some(ref key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Sync(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => Error::Auth(body),
            StatusCode::NOT_FOUND => Error::NotFound(body),
            StatusCode::BAD_REQUEST => Error::Validation(body),
            _ => Error::Sync(format!("Server returned {}: {}", status, body)),
        })
    }
}

#[async_trait]
impl ExpenseBackend for RemoteBackend {
    async fn create(&self, owner: &str, expense: &NewExpense) -> Result<Expense> {
        let builder = self
            .http_client
            .post(format!("{}/api/expenses", self.base_url))
            .json(expense);
        let response = self.send(self.request(builder, owner)).await?;

        let created: CreatedExpense = response
            .json()
            .await
            .map_err(|e| Error::Sync(format!("Invalid response body: {}", e)))?;
        let mut stored = created.expense;
        stored.sync_status = SyncStatus::Synced;
        debug!(id = %stored.id, "Remote expense created");
        Ok(stored)
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<()> {
        let builder = self
            .http_client
            .delete(format!("{}/api/expenses/{}", self.base_url, id));
        self.send(self.request(builder, owner)).await?;
        Ok(())
    }

    async fn list(&self, owner: &str, filter: &ExpenseFilter) -> Result<ExpensePage> {
        let mut query: Vec<(&str, String)> = vec![
            ("limit", filter.limit.to_string()),
            ("skip", filter.offset.to_string()),
        ];
        if let Some(ref plan) = filter.travel_plan_id {
            query.push(("travel_plan_id", plan.clone()));
        }
        if let Some(category) = filter.category {
            query.push(("category", category.as_str().to_string()));
        }

        let builder = self
            .http_client
            .get(format!("{}/api/expenses", self.base_url))
            .query(&query);
        let response = self.send(self.request(builder, owner)).await?;

        let mut page: ExpensePage = response
            .json()
            .await
            .map_err(|e| Error::Sync(format!("Invalid response body: {}", e)))?;
        for expense in &mut page.expenses {
            expense.sync_status = SyncStatus::Synced;
        }
        Ok(page)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::ExpenseCategory;
    use crate::store::{BackingStore, ExpenseStore};
    use crate::test_utils::MockExpenseServer;

    fn remote_store(server: &MockExpenseServer, owner: &str) -> ExpenseStore {
        ExpenseStore::new(
            Some(BackingStore::Remote(RemoteBackend::new(&server.url(), None))),
            Some(owner.to_string()),
        )
    }

    #[test]
    fn test_trims_trailing_slash() {
        let backend = RemoteBackend::new("http://localhost:3000/", None);
        assert_eq!(backend.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_sync_error() {
        let backend = RemoteBackend::new("http://127.0.0.1:1", Some("key"));
        let err = backend
            .create("alice", &NewExpense::new(ExpenseCategory::Food, 1.0, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sync(_)));
    }

    #[tokio::test]
    async fn test_store_round_trip_over_http() {
        let server = MockExpenseServer::start().await;
        let mut store = remote_store(&server, "alice");

        let expense = store
            .add(NewExpense::new(ExpenseCategory::Transport, 1500.0, "rail pass"))
            .await
            .unwrap();
        assert_eq!(expense.sync_status, SyncStatus::Synced);
        let held = server.records("alice");
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id, expense.id);
        assert_eq!(held[0].date, expense.date);

        let mut reader = remote_store(&server, "alice");
        assert_eq!(reader.load(&ExpenseFilter::all()).await.unwrap(), 1);
        assert_eq!(reader.list()[0].id, expense.id);
        assert_eq!(reader.list()[0].sync_status, SyncStatus::Synced);

        assert!(store.remove(&expense.id).await.unwrap().is_some());
        assert!(server.records("alice").is_empty());
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let server = MockExpenseServer::start().await;
        let mut alice = remote_store(&server, "alice");
        alice
            .add(NewExpense::new(ExpenseCategory::Food, 20.0, "ramen"))
            .await
            .unwrap();

        let mut bob = remote_store(&server, "bob");
        assert_eq!(bob.load(&ExpenseFilter::all()).await.unwrap(), 0);
        assert!(bob.is_empty());
    }

    #[tokio::test]
    async fn test_load_pages_over_http() {
        let server = MockExpenseServer::start().await;
        let records = server.backend();
        for _ in 0..101 {
            records
                .create("alice", &NewExpense::new(ExpenseCategory::Food, 10.0, "snack"))
                .await
                .unwrap();
        }

        let mut store = remote_store(&server, "alice");
        assert_eq!(store.load(&ExpenseFilter::all()).await.unwrap(), 101);
        let total: f64 = store.list().iter().map(|e| e.amount).sum();
        assert_eq!(total, 1010.0);
    }

    #[tokio::test]
    async fn test_list_applies_category_filter() {
        let server = MockExpenseServer::start().await;
        let backend = RemoteBackend::new(&server.url(), None);
        backend
            .create("alice", &NewExpense::new(ExpenseCategory::Food, 10.0, ""))
            .await
            .unwrap();
        backend
            .create("alice", &NewExpense::new(ExpenseCategory::Shopping, 30.0, ""))
            .await
            .unwrap();

        let filter = ExpenseFilter {
            category: Some(ExpenseCategory::Shopping),
            ..ExpenseFilter::all()
        };
        let page = backend.list("alice", &filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.total_amount, 30.0);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let server = MockExpenseServer::start().await;
        let backend = RemoteBackend::new(&server.url(), None);

        let err = backend.delete("alice", "missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_owner_is_auth_error() {
        let server = MockExpenseServer::start().await;
        let backend = RemoteBackend::new(&server.url(), None);

        let err = backend.list("", &ExpenseFilter::all()).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_rejected_amount_is_validation_error() {
        let server = MockExpenseServer::start().await;
        let backend = RemoteBackend::new(&server.url(), None);

        let err = backend
            .create("alice", &NewExpense::new(ExpenseCategory::Food, -5.0, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(server.records("alice").is_empty());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockExpenseServer::start().await;
        let backend = RemoteBackend::new(&server.url(), None);

        server.fail_with(401);
        let err = backend.list("alice", &ExpenseFilter::all()).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));

        server.fail_with(503);
        let err = backend.list("alice", &ExpenseFilter::all()).await.unwrap_err();
        assert!(matches!(err, Error::Sync(_)));

        server.recover();
        assert!(backend.list("alice", &ExpenseFilter::all()).await.is_ok());
    }

    #[tokio::test]
    async fn test_server_failure_keeps_local_copy() {
        let server = MockExpenseServer::start().await;
        server.fail_with(500);
        let mut store = remote_store(&server, "alice");

        let expense = store
            .add(NewExpense::new(ExpenseCategory::Other, 5.0, "locker"))
            .await
            .unwrap();
        assert_eq!(expense.sync_status, SyncStatus::Failed);

        server.recover();
        assert_eq!(store.retry_failed().await, 1);
        assert_eq!(server.records("alice")[0].id, store.list()[0].id);
    }

    #[tokio::test]
    async fn test_interrupted_add_stays_pending() {
        let server = MockExpenseServer::start().await;
        server.set_delay(Duration::from_secs(5));
        let mut store = remote_store(&server, "alice");

        let result = tokio::time::timeout(
            Duration::from_millis(100),
            store.add(NewExpense::new(ExpenseCategory::Food, 12.0, "bento")),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].sync_status, SyncStatus::Pending);

        server.set_delay(Duration::ZERO);
        assert_eq!(store.retry_failed().await, 1);
        assert_eq!(store.list()[0].sync_status, SyncStatus::Synced);
        assert!(server
            .records("alice")
            .iter()
            .any(|e| e.id == store.list()[0].id));
    }
}
