//! M3U playlist parser
//!
//! Line oriented: the `#EXTM3U` header may advertise an EPG url, and every
//! `#EXTINF:` line describes the stream url on the next line.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::defaults::DEFAULT_M3U_GROUP;
use crate::models::{Channel, ParsedPlaylist};

static TVG_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:x-tvg-url|url-tvg)=(?:"([^"]*)"|([^\s"]+))"#).expect("valid tvg url regex")
});

static TVG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-id="([^"]*)""#).expect("valid tvg-id regex"));
static TVG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-name="([^"]*)""#).expect("valid tvg-name regex"));
static TVG_LOGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-logo="([^"]*)""#).expect("valid tvg-logo regex"));
static GROUP_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"group-title="([^"]*)""#).expect("valid group-title regex"));

fn attribute(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim().to_string())
}

/// EPG url from the header; only the first of several joined urls is kept
fn header_tvg_url(line: &str) -> Option<String> {
    let caps = TVG_URL.captures(line)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let first = raw.split(',').next().unwrap_or_default().trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Metadata of one `#EXTINF:` line
struct ExtInf {
    tvg_id: String,
    name: String,
    logo: String,
    group: String,
}

impl ExtInf {
    fn parse(line: &str) -> Self {
        let title = line
            .rfind(',')
            .map(|pos| line[pos + 1..].trim())
            .unwrap_or_default();
        let tvg_name = attribute(&TVG_NAME, line).unwrap_or_default();
        let name = if title.is_empty() {
            tvg_name
        } else {
            title.to_string()
        };

        Self {
            tvg_id: attribute(&TVG_ID, line).unwrap_or_default(),
            name,
            logo: attribute(&TVG_LOGO, line).unwrap_or_default(),
            group: attribute(&GROUP_TITLE, line)
                .filter(|group| !group.is_empty())
                .unwrap_or_else(|| DEFAULT_M3U_GROUP.to_string()),
        }
    }
}

/// Parse M3U content into channels
///
/// The non-comment line directly after an `#EXTINF:` line is its stream url.
/// An `#EXTINF:` followed by another comment line yields nothing, and entries
/// without any name are skipped. Ids are `{source_key}-{n}` over emitted
/// channels only.
pub fn parse_m3u(source_key: &str, content: &str) -> ParsedPlaylist {
    let mut playlist = ParsedPlaylist::default();
    let mut header_seen = false;
    let mut skipped = 0usize;

    let mut lines = content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();

    while let Some(line) = lines.next() {
        if !header_seen && line.starts_with("#EXTM3U") {
            header_seen = true;
            playlist.tvg_url = header_tvg_url(line);
            continue;
        }

        if !line.starts_with("#EXTINF:") {
            continue;
        }

        let Some(url) = lines.next_if(|next| !next.starts_with('#')) else {
            skipped += 1;
            continue;
        };

        let info = ExtInf::parse(line);
        if info.name.is_empty() {
            skipped += 1;
            continue;
        }

        let ordinal = playlist.channels.len();
        playlist.channels.push(Channel::new(
            source_key, ordinal, info.tvg_id, info.name, info.logo, info.group, url,
        ));
    }

    debug!(
        "Parsed {} M3U channels for '{}' (skipped {}, tvg_url: {:?})",
        playlist.channels.len(),
        source_key,
        skipped,
        playlist.tvg_url
    );
    playlist
}
