//! Error types for Tripfund

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing input, rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation needs an account and none is present
    #[error("Authentication required: {0}")]
    Auth(String),

    /// A backing-store write or delete failed
    #[error("Sync error: {0}")]
    Sync(String),

    /// The upstream text-generation call failed
    #[error("Analysis failed{}: {message}", status_suffix(.status))]
    Analysis {
        /// Upstream HTTP status, if the request got that far
        status: Option<u16>,
        message: String,
    },

    /// A budget manager action was requested from the wrong state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

impl Error {
    /// Build an analysis error from an upstream response
    pub fn analysis(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Analysis {
            status,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
