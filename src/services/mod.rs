//! Services
//!
//! - [`epg_matcher`] joins playlist channels to parsed guide data
//! - [`live_channel_cache::LiveChannelCache`] holds the last good result per source
//! - [`live_source_service::LiveSourceService`] ties the pipeline, the cache
//!   and the config store together; it is what callers talk to

pub mod epg_matcher;
pub mod live_channel_cache;
pub mod live_source_service;

pub use epg_matcher::{EpgMatch, match_channels, normalize_channel_name};
pub use live_channel_cache::LiveChannelCache;
pub use live_source_service::LiveSourceService;
