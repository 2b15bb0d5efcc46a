//! TVBox TXT playlist parser
//!
//! ```text
//! News,#genre#
//! CCTV-1,http://a/1.m3u8$hd
//! ```

use tracing::debug;

use crate::config::defaults::DEFAULT_TXT_GROUP;
use crate::models::{Channel, ParsedPlaylist};

const GENRE_TOKEN: &str = ",#genre#";

/// Parse TXT content into channels
///
/// TXT carries no channel identifier, so `tvg_id` mirrors the name.
pub fn parse_txt(source_key: &str, content: &str) -> ParsedPlaylist {
    let mut playlist = ParsedPlaylist::default();
    let mut group = DEFAULT_TXT_GROUP.to_string();

    for line in content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
    {
        if line.contains(GENRE_TOKEN) {
            let header = line.split(',').next().unwrap_or_default().trim();
            group = if header.is_empty() {
                DEFAULT_TXT_GROUP.to_string()
            } else {
                header.to_string()
            };
            continue;
        }

        let Some((name, url)) = line.split_once(',') else {
            continue;
        };
        let name = name.trim();
        let url = url.split('$').next().unwrap_or_default().trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }

        let ordinal = playlist.channels.len();
        playlist
            .channels
            .push(Channel::new(source_key, ordinal, name, name, "", group.as_str(), url));
    }

    debug!(
        "Parsed {} TXT channels for '{}'",
        playlist.channels.len(),
        source_key
    );
    playlist
}
