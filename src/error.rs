//! Error types for each boundary of the watcher.

use std::path::PathBuf;

use thiserror::Error;

use crate::retry::Retryable;

/// A failed search request. Any of these aborts the whole fetch for a cycle.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed search response: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single message that could not be delivered.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("message rejected: {0}")]
    Rejected(String),

    /// Rate limited or a server-side failure; worth another attempt.
    #[error("messaging API unavailable ({status}): {description}")]
    Unavailable {
        status: reqwest::StatusCode,
        description: String,
    },
}

/// Transport failures other than an undecodable body.
fn transient(e: &reqwest::Error) -> bool {
    !(e.is_decode() || e.is_builder() || e.is_redirect())
}

fn transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => transient(e),
            FetchError::Status(status) => transient_status(*status),
            FetchError::Json(_) => false,
        }
    }
}

impl Retryable for NotifyError {
    fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Http(e) => transient(e),
            NotifyError::Rejected(_) => false,
            NotifyError::Unavailable { .. } => true,
        }
    }
}

impl NotifyError {
    /// Classify a non-successful API reply by its HTTP status.
    pub fn from_reply(status: reqwest::StatusCode, description: String) -> Self {
        if transient_status(status) {
            NotifyError::Unavailable { status, description }
        } else {
            NotifyError::Rejected(description)
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Startup configuration problems. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}
