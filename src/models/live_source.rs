//! Live source model implementations

use crate::errors::{SourceError, SourceResult};
use crate::models::{LiveSource, PlaylistFormat};

impl LiveSource {
    pub fn new(key: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Configured user-agent override, ignoring blank values
    pub fn user_agent_override(&self) -> Option<&str> {
        self.user_agent
            .as_deref()
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
    }

    /// Configured EPG override, ignoring blank values
    pub fn epg_override(&self) -> Option<&str> {
        self.epg_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn is_tv_box_hint(&self) -> bool {
        self.is_tv_box.unwrap_or(false)
    }

    /// Check the descriptor without touching the network
    pub fn validate(&self) -> SourceResult<()> {
        if self.key.trim().is_empty() {
            return Err(SourceError::invalid_config("key", "live source key must not be empty"));
        }
        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SourceError::invalid_config(
                "url",
                format!("live source '{}' must use an http or https url", self.key),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for PlaylistFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaylistFormat::M3u => write!(f, "m3u"),
            PlaylistFormat::TvBoxJson => write!(f, "tvbox-json"),
            PlaylistFormat::TvBoxTxt => write!(f, "tvbox-txt"),
            PlaylistFormat::Unknown => write!(f, "unknown"),
        }
    }
}
