//! Channel and parsed playlist model implementations

use crate::models::{Channel, ParsedPlaylist};

impl Channel {
    pub fn new(
        source_key: &str,
        ordinal: usize,
        tvg_id: impl Into<String>,
        name: impl Into<String>,
        logo: impl Into<String>,
        group: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{source_key}-{ordinal}"),
            tvg_id: tvg_id.into(),
            name: name.into(),
            logo: logo.into(),
            group: group.into(),
            url: url.into(),
        }
    }

    /// Key used to join this channel to EPG data: `tvg_id`, else `name`
    pub fn match_key(&self) -> &str {
        if self.tvg_id.is_empty() {
            &self.name
        } else {
            &self.tvg_id
        }
    }
}

impl ParsedPlaylist {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
