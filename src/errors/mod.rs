//! Centralized error handling for the live ingestion pipeline
//!
//! This module provides the error types shared by every pipeline stage, from
//! fetching a live source through EPG correlation and caching.
//!
//! # Error Categories
//!
//! - **Source Errors**: upstream fetch failures, undecodable payloads, empty parses
//! - **Configuration Errors**: invalid or unreadable configuration documents
//! - **Lookup Errors**: keys missing from the configuration store
//!
//! # Usage
//!
//! ```rust
//! use live_ingest::errors::{AppError, AppResult};
//!
//! async fn example_function() -> AppResult<String> {
//!     // Function can return any error type that converts to AppError
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
