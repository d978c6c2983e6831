//! Pluggable text-generation backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: one chat completion with a system and a user message
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai_compatible, dashscope, mock). Default: openai_compatible
//! - `TRIPFUND_LLM_HOST`, `TRIPFUND_LLM_MODEL`, `TRIPFUND_LLM_API_KEY`: see [`crate::config`]

mod mock;
mod openai_compatible;

pub use mock::{MockBackend, MockReply};
pub use openai_compatible::OpenAICompatibleBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Environment variable selecting the backend
pub const BACKEND_ENV: &str = "AI_BACKEND";

/// Trait defining the interface for all text-generation backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one chat completion
    ///
    /// Returns `Ok(None)` when the provider answered but produced no content.
    async fn complete(&self, system: &str, prompt: &str) -> Result<Option<String>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI-compatible chat completions (DashScope compatible-mode by default)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `openai_compatible` / `openai` / `dashscope` (default): loads
    ///   [`crate::config::AnalysisConfig`] and applies the environment
    /// - `mock`: Creates a mock backend for testing
    pub fn from_env() -> Result<Self> {
        let backend =
            std::env::var(BACKEND_ENV).unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" | "dashscope" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Ok(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai_compatible");
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Whether a credential is available for the configured backend
    pub fn has_credentials(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.has_api_key(),
            AIClient::Mock(_) => true,
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Option<String>> {
        match self {
            AIClient::OpenAICompatible(b) => b.complete(system, prompt).await,
            AIClient::Mock(b) => b.complete(system, prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
