use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod channel;
pub mod live_channels;
pub mod live_source;

/// Operator-supplied live TV source descriptor, owned by the config store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveSource {
    pub key: String,
    pub name: String,
    pub url: String,
    /// User-agent override for the playlist fetch
    #[serde(rename = "ua", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// EPG url override; takes precedence over the playlist's `x-tvg-url`
    #[serde(rename = "epg", default, skip_serializing_if = "Option::is_none")]
    pub epg_url: Option<String>,
    /// Manual hint that the url points at a TVBox JSON config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_tv_box: Option<bool>,
    #[serde(default)]
    pub disabled: bool,
    /// Channel count of the last successful refresh
    #[serde(default)]
    pub channel_number: usize,
}

/// A playable channel produced by one of the playlist parsers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// `{source_key}-{ordinal}`, stable only within one refresh
    pub id: String,
    pub tvg_id: String,
    pub name: String,
    pub logo: String,
    pub group: String,
    pub url: String,
}

/// One programme of the guide; timestamps are the raw XMLTV strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpgProgram {
    pub start: String,
    pub end: String,
    pub title: String,
}

/// Result of one full pipeline run for a live source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveChannels {
    pub channel_number: usize,
    pub channels: Vec<Channel>,
    pub epg_url: String,
    /// Programmes keyed by channel match key (`tvg_id`, else `name`)
    pub epgs: HashMap<String, Vec<EpgProgram>>,
    /// EPG icons keyed by channel match key
    pub epg_logos: HashMap<String, String>,
}

/// Wire format of a fetched live source body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaylistFormat {
    M3u,
    TvBoxJson,
    TvBoxTxt,
    Unknown,
}

/// Output of a playlist parser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPlaylist {
    /// EPG url advertised by the playlist header
    pub tvg_url: Option<String>,
    pub channels: Vec<Channel>,
}
