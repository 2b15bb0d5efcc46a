/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Config file defaults
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const CONFIG_FILE_ENV: &str = "LIVE_INGEST_CONFIG";

// HTTP defaults
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
// TVBox upstreams tend to reject browser agents and expect an OkHttp client
pub const DEFAULT_TVBOX_USER_AGENT: &str = "okhttp/3.15";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

// EPG defaults
pub const DEFAULT_EPG_ENABLED: bool = true;

// Playlist group defaults
pub const DEFAULT_M3U_GROUP: &str = "无分组";
pub const DEFAULT_TXT_GROUP: &str = "默认分组";
