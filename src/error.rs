// src/error.rs

//! Unified error handling for the scraper and its HTTP surface.

use std::fmt;

use thiserror::Error;

/// Result type alias for module-of-the-week operations.
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

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Listing or detail page did not yield an item
    #[error("Extraction error for {context}: {message}")]
    Extraction { context: String, message: String },

    /// Raw date did not match any accepted pattern
    #[error("Cannot parse date '{raw}' of module '{name}'")]
    DateParse { name: String, raw: String },

    /// No published modules to answer from
    #[error("Cache not ready.")]
    EmptyCollection,

    /// Tag filter matched nothing
    #[error("No modules tagged '{tag}'")]
    NotFound { tag: String },

    /// Callback delivery failed
    #[error("Delivery to {url} failed: {message}")]
    Delivery { url: String, message: String },
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

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error with context.
    pub fn extraction(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a date parse error.
    pub fn date_parse(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::DateParse {
            name: name.into(),
            raw: raw.into(),
        }
    }

    /// Create a not-found error for a tag filter.
    pub fn not_found(tag: impl Into<String>) -> Self {
        Self::NotFound { tag: tag.into() }
    }

    /// Create a delivery error.
    pub fn delivery(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Delivery {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
