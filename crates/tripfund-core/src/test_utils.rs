//! Test utilities for tripfund-core
//!
//! This module provides a mock chat completions server that speaks the
//! OpenAI-compatible protocol, and a mock `/api/expenses` server for the
//! remote backing store, so the real HTTP clients can be exercised in unit
//! and integration tests without network access.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::models::{Expense, ExpenseCategory, ExpenseFilter, NewExpense};
use crate::store::{ExpenseBackend, MemoryBackend, OWNER_HEADER};
use crate::Error;

/// Advice text returned by [`MockLlmServer::start`]
pub const MOCK_ADVICE: &str = "1. Spending is on track.\n2. Food is the largest category.";

/// A chat completion request as the mock server received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

enum Reply {
    Content(Option<String>),
    Error { status: StatusCode, body: String },
}

struct MockState {
    reply: Reply,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock chat completions server for testing
pub struct MockLlmServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockLlmServer {
    /// Start a server that answers every request with [`MOCK_ADVICE`]
    pub async fn start() -> Self {
        Self::with_content(Some(MOCK_ADVICE)).await
    }

    /// Start a server that answers with the given message content
    ///
    /// `None` produces a choice whose message has no content field.
    pub async fn with_content(content: Option<&str>) -> Self {
        Self::spawn(Reply::Content(content.map(str::to_string))).await
    }

    /// Start a server that fails every completion with `status` and `body`
    pub async fn with_error(status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        Self::spawn(Reply::Error {
            status,
            body: body.to_string(),
        })
        .await
    }

    async fn spawn(reply: Reply) -> Self {
        let state = Arc::new(MockState {
            reply,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockLlmServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_models() -> Json<Value> {
    Json(json!({ "object": "list", "data": [{ "id": "qwen-turbo", "object": "model" }] }))
}

async fn handle_chat(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let model = body["model"].as_str().unwrap_or("qwen-turbo").to_string();

    state.requests.lock().unwrap().push(RecordedRequest {
        authorization,
        body,
    });

    match &state.reply {
        Reply::Content(content) => {
            let message = match content {
                Some(text) => json!({ "role": "assistant", "content": text }),
                None => json!({ "role": "assistant" }),
            };
            Json(json!({
                "id": "chatcmpl-mock",
                "object": "chat.completion",
                "model": model,
                "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }]
            }))
            .into_response()
        }
        Reply::Error { status, body } => (*status, body.clone()).into_response(),
    }
}

// =============================================================================
// Expense server
// =============================================================================

struct ExpenseServerState {
    records: MemoryBackend,
    forced_status: Mutex<Option<StatusCode>>,
    delay: Mutex<Duration>,
}

/// Mock `/api/expenses` server for exercising `RemoteBackend`
///
/// Records live in a [`MemoryBackend`] keyed by the owner header. Requests
/// without that header get 401, like the real server behind its auth proxy.
pub struct MockExpenseServer {
    addr: SocketAddr,
    state: Arc<ExpenseServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    skip: i64,
    travel_plan_id: Option<String>,
    category: Option<ExpenseCategory>,
}

impl MockExpenseServer {
    pub async fn start() -> Self {
        let state = Arc::new(ExpenseServerState {
            records: MemoryBackend::new(),
            forced_status: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
        });

        let app = Router::new()
            .route("/api/expenses", get(handle_list).post(handle_create))
            .route("/api/expenses/:id", delete(handle_delete))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The server's record store; clones share state
    pub fn backend(&self) -> MemoryBackend {
        self.state.records.clone()
    }

    /// Records held for `owner`, in insertion order
    pub fn records(&self, owner: &str) -> Vec<Expense> {
        self.state.records.snapshot(owner)
    }

    /// Answer every request with `status` until [`recover`](Self::recover)
    pub fn fail_with(&self, status: u16) {
        *self.state.forced_status.lock().unwrap() = Some(StatusCode::from_u16(status).unwrap());
    }

    pub fn recover(&self) {
        *self.state.forced_status.lock().unwrap() = None;
    }

    /// Hold every response for `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockExpenseServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Apply the delay and forced status, then resolve the owner
async fn admit(state: &ExpenseServerState, headers: &HeaderMap) -> Result<String, Response> {
    let delay = *state.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let forced = *state.forced_status.lock().unwrap();
    if let Some(status) = forced {
        return Err((status, "Forced failure").into_response());
    }

    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Missing owner header").into_response())
}

fn error_response(err: Error) -> Response {
    let status = match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

async fn handle_list(
    State(state): State<Arc<ExpenseServerState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    let owner = match admit(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    let limit = if query.limit > 0 {
        query.limit
    } else {
        ExpenseFilter::DEFAULT_LIMIT
    };
    let filter = ExpenseFilter {
        travel_plan_id: query.travel_plan_id,
        category: query.category,
        limit,
        offset: query.skip.max(0),
    };
    match state.records.list(&owner, &filter).await {
        Ok(page) => Json(json!({
            "expenses": page.expenses,
            "total": page.total,
            "total_amount": page.total_amount,
            "limit": filter.limit,
            "skip": filter.offset,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_create(
    State(state): State<Arc<ExpenseServerState>>,
    headers: HeaderMap,
    Json(expense): Json<NewExpense>,
) -> Response {
    let owner = match admit(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    let result = match expense.validate() {
        Ok(expense) => state.records.create(&owner, &expense).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(expense) => (StatusCode::CREATED, Json(json!({ "expense": expense }))).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_delete(
    State(state): State<Arc<ExpenseServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let owner = match admit(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };

    match state.records.delete(&owner, &id).await {
        Ok(()) => Json(json!({ "deleted": true })).into_response(),
        Err(e) => error_response(e),
    }
}
