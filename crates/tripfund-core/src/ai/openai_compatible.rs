//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API.
//! The default host is DashScope's compatible-mode endpoint, which serves
//! the Qwen models.
//!
//! # Configuration
//!
//! See [`crate::config::AnalysisConfig`] for the file and environment layers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

use super::AIBackend;

/// OpenAI-compatible backend
///
/// Sends one `POST {host}/v1/chat/completions` per completion with a bearer
/// credential. There is no retry.
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    config: AnalysisConfig,
}

impl OpenAICompatibleBackend {
    /// Create a backend from resolved settings
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            http_client: Client::new(),
            base_url: config.host.trim_end_matches('/').to_string(),
            config,
        }
    }

    /// Create from the config file layers and environment variables
    pub fn from_env() -> Result<Self> {
        AnalysisConfig::load().map(Self::new)
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        let mut backend = self.clone();
        backend.config.model = model.to_string();
        backend
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Make a chat completion request
    async fn chat_completion(&self, system: &str, prompt: &str) -> Result<Option<String>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::analysis(None, "No API key provided"))?;

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::analysis(e.status().map(|s| s.as_u16()), e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), model = %self.config.model, "Chat completion failed");
            return Err(Error::analysis(Some(status.as_u16()), body));
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::analysis(None, format!("Invalid response body: {}", e)))?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty()))
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Option<String>> {
        let response = self.chat_completion(system, prompt).await?;
        debug!(
            model = %self.config.model,
            has_content = response.is_some(),
            "OpenAI-compatible completion response"
        );
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        // Try /v1/models first (standard OpenAI endpoint)
        let mut models = self.http_client.get(format!("{}/v1/models", self.base_url));
        if let Some(ref api_key) = self.config.api_key {
            models = models.header("Authorization", format!("Bearer {}", api_key));
        }
        if let Ok(resp) = models.send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try root endpoint (some servers return 200 on /)
        if let Ok(resp) = self.http_client.get(&self.base_url).send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
