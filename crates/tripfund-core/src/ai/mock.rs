//! Mock backend for testing
//!
//! Returns a configurable reply and records every prompt it receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::AIBackend;

const DEFAULT_ADVICE: &str = "Spending is within budget. Keep tracking daily costs.";

/// What the mock answers with
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Reply with this text
    Text(String),
    /// Answer without content
    Empty,
    /// Fail like an upstream error
    Fail {
        status: Option<u16>,
        message: String,
    },
}

/// Mock AI backend for testing
///
/// Clones share the call counter and prompt log.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    reply: MockReply,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            reply: MockReply::Text(DEFAULT_ADVICE.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    pub fn with_reply(text: &str) -> Self {
        Self::replying(MockReply::Text(text.to_string()))
    }

    pub fn empty() -> Self {
        Self::replying(MockReply::Empty)
    }

    pub fn failing(status: Option<u16>, message: &str) -> Self {
        Self::replying(MockReply::Fail {
            status,
            message: message.to_string(),
        })
    }

    fn replying(reply: MockReply) -> Self {
        Self {
            reply,
            ..Self::new()
        }
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    /// Number of completions requested so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match &self.reply {
            MockReply::Text(text) => Ok(Some(text.clone())),
            MockReply::Empty => Ok(None),
            MockReply::Fail { status, message } => Err(Error::analysis(*status, message.clone())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
