use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::IngestionConfig;
use crate::errors::{AppError, AppResult, SourceError};
use crate::utils::url::UrlUtils;
use crate::utils::{CompressionFormat, DecompressionService};

/// Body of a streamed response, chunk by chunk
pub type ByteStream = BoxStream<'static, AppResult<Bytes>>;

/// HTTP seam of the pipeline
///
/// `fetch_text` returns a whole (decompressed) body for playlists and configs;
/// `fetch_stream` hands out raw chunks for documents too large to buffer.
/// A `None` user-agent means the client's default.
#[async_trait]
pub trait DecompressingHttpClient: Send + Sync {
    /// Fetch URL and return decompressed text content
    async fn fetch_text(&self, url: &str, user_agent: Option<&str>) -> AppResult<String>;

    /// Fetch URL and return the body as a stream of raw chunks
    async fn fetch_stream(&self, url: &str, user_agent: Option<&str>) -> AppResult<ByteStream>;
}

/// Default implementation of DecompressingHttpClient using reqwest
pub struct StandardHttpClient {
    client: Client,
    default_user_agent: String,
}

impl StandardHttpClient {
    pub fn new(config: &IngestionConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            default_user_agent: config.user_agent.clone(),
        })
    }

    async fn send(&self, url: &str, user_agent: Option<&str>) -> AppResult<Response> {
        let ua = user_agent.unwrap_or(&self.default_user_agent);
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, ua)
            .send()
            .await
            .map_err(|e| {
                AppError::fetch_failed(
                    UrlUtils::obfuscate_credentials(url),
                    UrlUtils::obfuscate_credentials(&e.to_string()),
                )
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Http {
                status: response.status().as_u16(),
                url: UrlUtils::obfuscate_credentials(url),
            }
            .into());
        }

        Ok(response)
    }
}

#[async_trait]
impl DecompressingHttpClient for StandardHttpClient {
    async fn fetch_text(&self, url: &str, user_agent: Option<&str>) -> AppResult<String> {
        debug!(
            "Fetching text content from: {}",
            UrlUtils::obfuscate_credentials(url)
        );

        let response = self.send(url, user_agent).await?;
        let bytes = response.bytes().await.map_err(|e| {
            AppError::fetch_failed(
                UrlUtils::obfuscate_credentials(url),
                format!("Failed to read response: {e}"),
            )
        })?;

        let compression_format = DecompressionService::detect_compression_format(&bytes);
        let decompressed_bytes = match compression_format {
            CompressionFormat::Uncompressed => bytes.to_vec(),
            CompressionFormat::Gzip => {
                debug!("Content is gzip compressed, decompressing");
                DecompressionService::decompress(bytes)?
            }
        };

        let content = match String::from_utf8(decompressed_bytes) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Content from {} is not valid UTF-8, decoding lossily",
                    UrlUtils::obfuscate_credentials(url)
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        debug!(
            "Successfully fetched {} bytes of text content (compression: {:?})",
            content.len(),
            compression_format
        );
        Ok(content)
    }

    async fn fetch_stream(&self, url: &str, user_agent: Option<&str>) -> AppResult<ByteStream> {
        debug!(
            "Streaming content from: {}",
            UrlUtils::obfuscate_credentials(url)
        );

        let response = self.send(url, user_agent).await?;
        let obfuscated = UrlUtils::obfuscate_credentials(url);
        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| {
                AppError::fetch_failed(obfuscated.clone(), format!("Error reading chunk: {e}"))
            })
        });

        Ok(stream.boxed())
    }
}
