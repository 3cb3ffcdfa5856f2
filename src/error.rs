// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listing page unreachable or unparseable
    #[error("Scrape error for {url}: {message}")]
    Scrape { url: String, message: String },

    /// State load/save failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Delivery failure for a single notification sink
    #[error("Sink '{sink}' failed: {message}")]
    Sink { sink: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a scrape error for the given source URL.
    pub fn scrape(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Scrape {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Create a sink delivery error.
    pub fn sink(sink: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_error_display() {
        let err = AppError::scrape("https://example.com/careers", "HTTP 503");
        assert_eq!(
            err.to_string(),
            "Scrape error for https://example.com/careers: HTTP 503"
        );
    }

    #[test]
    fn test_sink_error_display() {
        let err = AppError::sink("email", "missing api_key");
        assert_eq!(err.to_string(), "Sink 'email' failed: missing api_key");
    }
}
