//! Live source format handling
//!
//! Everything in this module is a pure function of the fetched text: no I/O,
//! no shared state. The ingestor composes the pieces in order:
//!
//! 1. [`obfuscation::resolve_obfuscated`] undoes marker + Base64 hiding
//! 2. [`detector::detect_format`] classifies the (decoded) body
//! 3. [`tvbox::TvBoxConfig`] extracts the first `lives` entry of a meta-config
//! 4. [`m3u::parse_m3u`] / [`txt::parse_txt`] produce the channel list
//!
//! # Usage
//!
//! ```rust
//! use live_ingest::models::PlaylistFormat;
//! use live_ingest::sources::{detector, m3u, obfuscation};
//!
//! let body = "#EXTM3U\n#EXTINF:-1,CCTV-1\nhttp://stream/1.m3u8";
//! let content = obfuscation::resolve_obfuscated(body);
//! assert_eq!(detector::detect_format(&content, "http://x/live", false), PlaylistFormat::M3u);
//! assert_eq!(m3u::parse_m3u("cn", &content).channels.len(), 1);
//! ```

pub mod detector;
pub mod m3u;
pub mod obfuscation;
pub mod tvbox;
pub mod txt;

pub use detector::{classify_playlist, detect_format};
pub use m3u::parse_m3u;
pub use obfuscation::resolve_obfuscated;
pub use tvbox::{TvBoxConfig, TvBoxLive};
pub use txt::parse_txt;
