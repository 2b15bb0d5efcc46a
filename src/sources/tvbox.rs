//! TVBox meta-config model
//!
//! A TVBox config is a JSON document describing sites, parsers and live
//! sources. Only `lives` matters here, and only its first entry: the format
//! defines no selection policy for further entries.

use serde::{Deserialize, Serialize};

use crate::errors::{SourceError, SourceResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TvBoxConfig {
    #[serde(default)]
    pub lives: Vec<TvBoxLive>,
}

/// One `lives` entry; unknown fields are ignored
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TvBoxLive {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ua: Option<String>,
}

impl TvBoxConfig {
    pub fn from_json(content: &str) -> SourceResult<Self> {
        let content = content.trim_start_matches('\u{feff}').trim();
        serde_json::from_str(content).map_err(|e| SourceError::DecodeFailed {
            message: format!("invalid TVBox config: {e}"),
        })
    }

    /// The entry the pipeline follows
    pub fn first_live(&self) -> SourceResult<&TvBoxLive> {
        let live = self
            .lives
            .first()
            .ok_or_else(|| SourceError::invalid_config("lives", "TVBox config has no live entries"))?;
        if live.url.trim().is_empty() {
            return Err(SourceError::invalid_config(
                "lives[0].url",
                "first TVBox live entry has no url",
            ));
        }
        Ok(live)
    }
}

impl TvBoxLive {
    /// The entry's own user-agent, if set
    pub fn user_agent(&self) -> Option<&str> {
        self.ua.as_deref().map(str::trim).filter(|ua| !ua.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_live_entry_is_used() {
        let config = TvBoxConfig::from_json(
            r#"{"sites":[{"key":"x"}],"lives":[
                {"name":"a","url":"http://x/live.txt","ua":"okhttp/3.15","epg":"http://e/{name}"},
                {"name":"b","url":"http://x/other.m3u"}
            ]}"#,
        )
        .unwrap();

        let live = config.first_live().unwrap();
        assert_eq!(live.url, "http://x/live.txt");
        assert_eq!(live.user_agent(), Some("okhttp/3.15"));
    }

    #[test]
    fn test_empty_lives_is_an_error() {
        let config = TvBoxConfig::from_json(r#"{"lives":[]}"#).unwrap();
        assert!(matches!(
            config.first_live(),
            Err(SourceError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_blank_ua_means_default() {
        let config = TvBoxConfig::from_json(r#"{"lives":[{"url":"http://x","ua":""}]}"#).unwrap();
        assert_eq!(config.first_live().unwrap().user_agent(), None);
    }
}
