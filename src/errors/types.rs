//! Error type definitions for the live ingestion pipeline
//!
//! The hierarchy mirrors the failure taxonomy of a pipeline run: `SourceError`
//! covers everything that can go wrong while talking to an upstream or reading
//! what it returned, and `AppError` wraps it together with configuration and
//! I/O failures.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Source handling errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors (configuration document reads and writes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization failures
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Source handling specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network error or unreadable body while fetching an upstream
    #[error("Fetch failed: {url} - {message}")]
    FetchFailed { url: String, message: String },

    /// Upstream answered with a non-success status
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// A payload that looked encoded could not be decoded
    #[error("Decode failed: {message}")]
    DecodeFailed { message: String },

    /// A playlist parser ran but produced no channels
    #[error("No channels parsed for source '{source_key}'")]
    ParseEmpty { source_key: String },

    /// EPG could not be obtained; never fatal for a pipeline run
    #[error("EPG unavailable: {reason}")]
    EpgUnavailable { reason: String },

    /// Invalid source configuration
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a fetch failure for the given (already obfuscated) url
    pub fn fetch_failed<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Source(SourceError::fetch_failed(url, message))
    }
}

impl SourceError {
    pub fn fetch_failed<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn parse_empty<S: Into<String>>(source_key: S) -> Self {
        Self::ParseEmpty {
            source_key: source_key.into(),
        }
    }

    pub fn epg_unavailable<S: Into<String>>(reason: S) -> Self {
        Self::EpgUnavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}
