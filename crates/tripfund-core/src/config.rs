//! Analysis configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tripfund/config/analysis.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables then override the endpoint and credential:
//! - `TRIPFUND_LLM_HOST`: chat completions server base URL
//! - `TRIPFUND_LLM_MODEL`: model name
//! - `TRIPFUND_LLM_API_KEY` (or `DASHSCOPE_API_KEY`): bearer credential

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/analysis.toml");

pub const HOST_ENV: &str = "TRIPFUND_LLM_HOST";
pub const MODEL_ENV: &str = "TRIPFUND_LLM_MODEL";
pub const API_KEY_ENV: &str = "TRIPFUND_LLM_API_KEY";
/// Credential variable used by DashScope deployments
pub const DASHSCOPE_API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

/// Settings for the analysis chat completion call
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            host: "https://dashscope.aliyuncs.com/compatible-mode".to_string(),
            model: "qwen-turbo".to_string(),
            api_key: None,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    generation: RawGeneration,
}

#[derive(Debug, Default, Deserialize)]
struct RawLlm {
    host: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGeneration {
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl AnalysisConfig {
    /// Load file config (override or embedded), then apply environment
    pub fn load() -> Result<Self> {
        let mut config = load_config(default_config_path().as_ref())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML document over the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let defaults = Self::default();
        Ok(Self {
            host: raw.llm.host.unwrap_or(defaults.host),
            model: raw.llm.model.unwrap_or(defaults.model),
            api_key: None,
            max_tokens: raw.generation.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: raw.generation.temperature.unwrap_or(defaults.temperature),
        })
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty(HOST_ENV) {
            self.host = host;
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            self.model = model;
        }
        if let Some(key) = non_empty(API_KEY_ENV).or_else(|| non_empty(DASHSCOPE_API_KEY_ENV)) {
            self.api_key = Some(key);
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tripfund").join("config").join("analysis.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)?,
        _ => DEFAULT_CONFIG.to_string(),
    };
    AnalysisConfig::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = AnalysisConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AnalysisConfig::from_toml("[generation]\ntemperature = 0.2\n").unwrap();
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.model, "qwen-turbo");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AnalysisConfig::from_toml("[generation\nmax_tokens = ").is_err());
    }

    #[test]
    fn test_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, "[llm]\nmodel = \"qwen-plus\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.model, "qwen-plus");

        let missing = dir.path().join("missing.toml");
        let config = load_config(Some(&missing)).unwrap();
        assert_eq!(config.model, "qwen-turbo");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (HOST_ENV, "http://localhost:8080"),
            (MODEL_ENV, ""),
            (DASHSCOPE_API_KEY_ENV, "sk-dash"),
        ]
        .into_iter()
        .collect();

        let mut config = AnalysisConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.host, "http://localhost:8080");
        // Empty values are ignored
        assert_eq!(config.model, "qwen-turbo");
        assert_eq!(config.api_key.as_deref(), Some("sk-dash"));
    }

    #[test]
    fn test_primary_key_wins_over_dashscope() {
        let mut config = AnalysisConfig::default();
        config.apply_env(|k| match k {
            API_KEY_ENV => Some("sk-primary".to_string()),
            DASHSCOPE_API_KEY_ENV => Some("sk-dash".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-primary"));
    }
}
