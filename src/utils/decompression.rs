use std::borrow::Cow;
use std::io::{self, Read, Write};

use bytes::Bytes;

use crate::errors::{SourceError, SourceResult};

/// Supported compression formats detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Uncompressed,
}

/// Magic byte detection and decompression utility
pub struct DecompressionService;

impl DecompressionService {
    /// Detect compression format using magic bytes
    pub fn detect_compression_format(data: &[u8]) -> CompressionFormat {
        match infer::get(data) {
            Some(kind) if kind.mime_type() == "application/gzip" => CompressionFormat::Gzip,
            _ => CompressionFormat::Uncompressed,
        }
    }

    /// Decompress a whole body based on detected format
    pub fn decompress(data: Bytes) -> SourceResult<Vec<u8>> {
        match Self::detect_compression_format(&data) {
            CompressionFormat::Gzip => Self::decompress_gzip(data),
            CompressionFormat::Uncompressed => Ok(data.to_vec()),
        }
    }

    #[cfg(feature = "compression-gzip")]
    fn decompress_gzip(data: Bytes) -> SourceResult<Vec<u8>> {
        let mut decoder = flate2::read::GzDecoder::new(data.as_ref());
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| SourceError::DecodeFailed {
                message: format!("Failed to decompress gzip data: {e}"),
            })?;
        Ok(decompressed)
    }

    #[cfg(not(feature = "compression-gzip"))]
    fn decompress_gzip(_data: Bytes) -> SourceResult<Vec<u8>> {
        Err(SourceError::DecodeFailed {
            message: "gzip content received but compression-gzip is disabled".to_string(),
        })
    }
}

/// Chunk-at-a-time decompressor for streamed bodies
///
/// The format is chosen from the first chunk. Gzip input is inflated as it
/// arrives so only the current chunk's output is held in memory.
pub enum StreamingDecompressor {
    Plain,
    #[cfg(feature = "compression-gzip")]
    Gzip(Box<flate2::write::GzDecoder<Vec<u8>>>),
}

impl StreamingDecompressor {
    pub fn for_first_chunk(chunk: &[u8]) -> SourceResult<Self> {
        match DecompressionService::detect_compression_format(chunk) {
            CompressionFormat::Uncompressed => Ok(Self::Plain),
            #[cfg(feature = "compression-gzip")]
            CompressionFormat::Gzip => Ok(Self::Gzip(Box::new(flate2::write::GzDecoder::new(
                Vec::new(),
            )))),
            #[cfg(not(feature = "compression-gzip"))]
            CompressionFormat::Gzip => Err(SourceError::DecodeFailed {
                message: "gzip stream received but compression-gzip is disabled".to_string(),
            }),
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::Plain)
    }

    /// Feed one chunk, returning whatever output it produced
    pub fn decode<'a>(&mut self, chunk: &'a [u8]) -> io::Result<Cow<'a, [u8]>> {
        match self {
            Self::Plain => Ok(Cow::Borrowed(chunk)),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip(decoder) => {
                decoder.write_all(chunk)?;
                Ok(Cow::Owned(std::mem::take(decoder.get_mut())))
            }
        }
    }

    /// Flush any buffered output at end of stream
    pub fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Plain => Ok(Vec::new()),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip(decoder) => (*decoder).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_uncompressed() {
        let data = b"#EXTM3U\n";
        let format = DecompressionService::detect_compression_format(data);
        assert_eq!(format, CompressionFormat::Uncompressed);
    }

    #[test]
    fn test_decompress_uncompressed() {
        let data = b"Hello, world!";
        let result = DecompressionService::decompress(Bytes::from(data.as_ref())).unwrap();
        assert_eq!(result, data);
    }

    #[cfg(feature = "compression-gzip")]
    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_detect_and_decompress_gzip() {
        let original_data = b"<tv></tv>";
        let compressed = gzip(original_data);

        let format = DecompressionService::detect_compression_format(&compressed);
        assert_eq!(format, CompressionFormat::Gzip);

        let decompressed = DecompressionService::decompress(Bytes::from(compressed)).unwrap();
        assert_eq!(decompressed, original_data);
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_streaming_gzip_in_small_chunks() {
        let original: Vec<u8> = "<programme channel=\"a\">\n".repeat(200).into_bytes();
        let compressed = gzip(&original);

        let mut decoder = StreamingDecompressor::for_first_chunk(&compressed).unwrap();
        assert!(decoder.is_compressed());

        let mut output = Vec::new();
        for chunk in compressed.chunks(7) {
            output.extend_from_slice(&decoder.decode(chunk).unwrap());
        }
        output.extend(decoder.finish().unwrap());
        assert_eq!(output, original);
    }
}
