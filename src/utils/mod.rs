//! Utility modules for the live ingestion pipeline
//!
//! This module contains the HTTP seam, decompression and URL helpers shared
//! by the pipeline stages.

pub mod decompression;
pub mod http_client;
pub mod url;

// Re-export commonly used types for convenience
pub use decompression::{CompressionFormat, DecompressionService};
pub use http_client::{ByteStream, DecompressingHttpClient, StandardHttpClient};
pub use url::UrlUtils;
