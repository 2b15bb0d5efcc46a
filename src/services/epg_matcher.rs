//! Channel to EPG correlation
//!
//! Playlist channels and XMLTV channels are keyed independently. A channel is
//! joined by its exact `tvg_id` when the guide has programmes under that id,
//! and otherwise by its normalized display name.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::ingestor::epg::EpgIndex;
use crate::models::{Channel, EpgProgram};

static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*?\]\s*").expect("valid tag regex"));
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+").expect("valid number regex"));
static QUALITY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:FHD|UHD|HD|4K)\b").expect("valid quality regex"));
// CJK names put the marker straight after a word character: 湖南卫视HD
static TRAILING_QUALITY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:FHD|UHD|HD|4K)$").expect("valid quality regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

fn normalize_once(name: &str) -> String {
    let name = LEADING_TAG.replace(name.trim(), "");
    let name = LEADING_NUMBER.replace(&name, "");
    let name = QUALITY_MARKER.replace_all(&name, "");
    let name = TRAILING_QUALITY_MARKER.replace(name.trim_end(), "");
    let name = WHITESPACE.replace_all(&name, " ");
    name.trim().to_lowercase()
}

/// Canonical form used on both sides of a name match
///
/// `"[HD] 1 CCTV-1 HD"` and `"cctv-1"` both become `"cctv-1"`. Stripping one
/// prefix can expose another, so passes repeat until the result is stable.
/// After the first pass the text is lowercase with single spaces, so every
/// further pass either shrinks it or changes nothing.
pub fn normalize_channel_name(name: &str) -> String {
    let mut current = normalize_once(name);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Guide data joined onto one channel list, keyed by match key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpgMatch {
    pub epgs: HashMap<String, Vec<EpgProgram>>,
    pub epg_logos: HashMap<String, String>,
}

impl EpgMatch {
    /// Give channels without a playlist logo their guide icon
    pub fn apply_logos(&self, channels: &mut [Channel]) {
        for channel in channels.iter_mut().filter(|c| c.logo.is_empty()) {
            if let Some(logo) = self.epg_logos.get(channel.match_key()) {
                channel.logo = logo.clone();
            }
        }
    }

    pub fn matched(&self) -> usize {
        self.epgs.len()
    }
}

/// EPG channel id for one playlist channel, if any
fn resolve<'a>(channel: &'a Channel, index: &'a EpgIndex) -> Option<&'a str> {
    let tvg_id = channel.tvg_id.trim();
    if !tvg_id.is_empty() && index.programs.contains_key(tvg_id) {
        return Some(tvg_id);
    }

    let normalized = normalize_channel_name(&channel.name);
    if normalized.is_empty() {
        return None;
    }
    index.name_to_id.get(&normalized).map(String::as_str)
}

/// Join channels to the guide
///
/// Channels with an empty match key never match. When several channels share
/// a match key the first one decides both programmes and logo.
pub fn match_channels(channels: &[Channel], index: &EpgIndex) -> EpgMatch {
    let mut result = EpgMatch::default();

    for channel in channels {
        let key = channel.match_key();
        if key.trim().is_empty() {
            continue;
        }
        let Some(epg_id) = resolve(channel, index) else {
            continue;
        };

        if let Some(programs) = index.programs.get(epg_id)
            && !result.epgs.contains_key(key)
        {
            result.epgs.insert(key.to_string(), programs.clone());
        }
        if let Some(logo) = index.logos.get(epg_id)
            && !result.epg_logos.contains_key(key)
        {
            result.epg_logos.insert(key.to_string(), logo.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn program(title: &str) -> EpgProgram {
        EpgProgram {
            start: "20240101080000 +0800".to_string(),
            end: "20240101090000 +0800".to_string(),
            title: title.to_string(),
        }
    }

    fn index() -> EpgIndex {
        let mut index = EpgIndex::default();
        index
            .programs
            .insert("cctv1".to_string(), vec![program("by id")]);
        index
            .programs
            .insert("other".to_string(), vec![program("by name")]);
        index
            .name_to_id
            .insert("cctv-1".to_string(), "other".to_string());
        index
            .name_to_id
            .insert("hunan".to_string(), "hunan-epg".to_string());
        index
            .logos
            .insert("other".to_string(), "http://logo/other.png".to_string());
        index
            .logos
            .insert("hunan-epg".to_string(), "http://logo/hunan.png".to_string());
        index
    }

    #[rstest]
    #[case("[HD] 1 CCTV-1 HD", "cctv-1")]
    #[case("cctv-1", "cctv-1")]
    #[case("  CCTV   5  4K ", "cctv 5")]
    #[case("101 FHD Sports", "sports")]
    #[case("湖南卫视HD", "湖南卫视")]
    #[case("[VIP] [HD] Movies", "movies")]
    #[case("HD", "")]
    #[case("[][][][][][][][][][][] News", "news")]
    #[case("Shadow", "shadow")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_channel_name(input), expected);
    }

    #[test]
    fn test_exact_id_beats_name() {
        let channels = vec![Channel::new("s", 0, "cctv1", "CCTV-1", "", "g", "http://a")];
        let matched = match_channels(&channels, &index());
        assert_eq!(matched.epgs["cctv1"][0].title, "by id");
        // logo follows the resolved id, which has none
        assert!(matched.epg_logos.is_empty());
    }

    #[test]
    fn test_unknown_id_falls_back_to_name() {
        let channels = vec![Channel::new("s", 0, "nope", "[HD] CCTV-1", "", "g", "http://a")];
        let matched = match_channels(&channels, &index());
        assert_eq!(matched.epgs["nope"][0].title, "by name");
        assert_eq!(matched.epg_logos["nope"], "http://logo/other.png");
    }

    #[test]
    fn test_logo_without_programmes() {
        let mut channels = vec![
            Channel::new("s", 0, "", "Hunan HD", "", "g", "http://a"),
            Channel::new("s", 1, "", "Hunan", "http://own.png", "g", "http://b"),
        ];
        let matched = match_channels(&channels, &index());
        assert!(matched.epgs.is_empty());
        assert_eq!(matched.epg_logos["Hunan HD"], "http://logo/hunan.png");

        matched.apply_logos(&mut channels);
        assert_eq!(channels[0].logo, "http://logo/hunan.png");
        assert_eq!(channels[1].logo, "http://own.png");
    }

    #[test]
    fn test_empty_names_never_match() {
        let mut index = index();
        index.name_to_id.insert(String::new(), "cctv1".to_string());
        let channels = vec![
            Channel::new("s", 0, "", "", "", "g", "http://a"),
            Channel::new("s", 1, "", "HD", "", "g", "http://b"),
        ];
        let matched = match_channels(&channels, &index);
        assert_eq!(matched, EpgMatch::default());
    }

    #[test]
    fn test_first_channel_with_key_wins() {
        let channels = vec![
            Channel::new("s", 0, "", "CCTV-1", "", "g", "http://a"),
            Channel::new("s", 1, "cctv1", "CCTV-1", "", "g", "http://b"),
            Channel::new("s", 2, "", "CCTV-1", "", "g", "http://c"),
        ];
        let matched = match_channels(&channels, &index());
        assert_eq!(matched.matched(), 2);
        assert_eq!(matched.epgs["CCTV-1"][0].title, "by name");
        assert_eq!(matched.epgs["cctv1"][0].title, "by id");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(name in "\\PC{0,40}") {
            let once = normalize_channel_name(&name);
            prop_assert_eq!(normalize_channel_name(&once), once);
        }

        #[test]
        fn prop_normalize_is_idempotent_on_channel_like_names(
            name in "(\\[[A-Za-z]{1,4}\\] ?)?([0-9]{1,3} )?[A-Za-z\u{4e00}-\u{4e20}-]{1,12}( (HD|hd|4K|FHD|UHD))?"
        ) {
            let once = normalize_channel_name(&name);
            prop_assert_eq!(normalize_channel_name(&once), once);
        }
    }
}
