//! Live source format detection
//!
//! Upstreams rarely send a useful content type, so the format is sniffed from
//! the body. Detection is an ordered table of `(predicate, format)` rules; the
//! first predicate that holds wins. New formats slot into the table without
//! touching the control flow.

use serde_json::Value;

use crate::models::PlaylistFormat;
use crate::utils::url::UrlUtils;

const M3U_HEADER: &str = "#EXTM3U";
const GENRE_TOKEN: &str = ",#genre#";

/// What the rules get to look at
#[derive(Debug, Clone, Copy)]
pub struct SniffInput<'a> {
    /// Body with surrounding whitespace and any BOM removed
    pub content: &'a str,
    pub url: &'a str,
    /// Manual `isTvBox` hint from the source descriptor
    pub tv_box_hint: bool,
}

impl<'a> SniffInput<'a> {
    pub fn new(content: &'a str, url: &'a str, tv_box_hint: bool) -> Self {
        Self {
            content: content.trim_start_matches('\u{feff}').trim(),
            url,
            tv_box_hint,
        }
    }
}

type Predicate = fn(&SniffInput<'_>) -> bool;

/// Rules for a primary fetch, in priority order
const PRIMARY_RULES: &[(Predicate, PlaylistFormat)] = &[
    (is_tvbox_config, PlaylistFormat::TvBoxJson),
    (has_m3u_header, PlaylistFormat::M3u),
    (looks_like_txt, PlaylistFormat::TvBoxTxt),
];

/// Rules for a body reached through a TVBox `lives` entry; never JSON
const PLAYLIST_RULES: &[(Predicate, PlaylistFormat)] = &[
    (has_m3u_header, PlaylistFormat::M3u),
    (looks_like_txt, PlaylistFormat::TvBoxTxt),
];

fn first_match(rules: &[(Predicate, PlaylistFormat)], input: &SniffInput<'_>) -> PlaylistFormat {
    rules
        .iter()
        .find(|(predicate, _)| predicate(input))
        .map(|(_, format)| *format)
        .unwrap_or(PlaylistFormat::Unknown)
}

/// Classify a primary fetch body
///
/// Must be called on the de-obfuscated body. `Unknown` means the caller should
/// fall back to best-effort M3U parsing.
pub fn detect_format(content: &str, url: &str, tv_box_hint: bool) -> PlaylistFormat {
    first_match(PRIMARY_RULES, &SniffInput::new(content, url, tv_box_hint))
}

/// Classify a playlist reached through a TVBox config
pub fn classify_playlist(content: &str) -> PlaylistFormat {
    first_match(PLAYLIST_RULES, &SniffInput::new(content, "", false))
}

/// A JSON object with an array field named `lives`
///
/// Parsing is attempted when the body starts with `{`, or when the url path
/// ends in `.json` or the descriptor says it is a TVBox config; both of those
/// are only hints and still need a valid `lives` array.
fn is_tvbox_config(input: &SniffInput<'_>) -> bool {
    let candidate = input.content.starts_with('{')
        || input.tv_box_hint
        || UrlUtils::has_json_extension(input.url);
    if !candidate {
        return false;
    }

    match serde_json::from_str::<Value>(input.content) {
        Ok(Value::Object(object)) => object.get("lives").is_some_and(Value::is_array),
        _ => false,
    }
}

fn has_m3u_header(input: &SniffInput<'_>) -> bool {
    input.content.contains(M3U_HEADER)
}

/// `group,#genre#` headers, or comma separated lines that are not XML
fn looks_like_txt(input: &SniffInput<'_>) -> bool {
    input.content.contains(GENRE_TOKEN)
        || (input.content.contains(',') && !input.content.starts_with('<'))
}
