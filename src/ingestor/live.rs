//! Full pipeline run for one live source

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::IngestionConfig;
use crate::errors::{AppError, AppResult, SourceError};
use crate::ingestor::epg::{EpgIndex, parse_epg_stream};
use crate::models::{LiveChannels, LiveSource, ParsedPlaylist, PlaylistFormat};
use crate::services::epg_matcher::match_channels;
use crate::sources::{
    TvBoxConfig, classify_playlist, detect_format, parse_m3u, parse_txt, resolve_obfuscated,
};
use crate::utils::{DecompressingHttpClient, UrlUtils};

/// Playlist text together with where it actually came from
struct FetchedPlaylist {
    playlist: ParsedPlaylist,
    /// Final playlist url, the TVBox `lives` url when one was followed
    url: String,
    user_agent: Option<String>,
}

/// Turns a [`LiveSource`] into [`LiveChannels`]
///
/// Steps run strictly in order since each needs the previous one's output:
/// playlist fetch, optional TVBox hop, parse, EPG fetch, match.
pub struct LiveIngestor {
    client: Arc<dyn DecompressingHttpClient>,
    config: IngestionConfig,
}

impl LiveIngestor {
    pub fn new(client: Arc<dyn DecompressingHttpClient>, config: IngestionConfig) -> Self {
        Self { client, config }
    }

    pub async fn ingest(&self, source: &LiveSource) -> AppResult<LiveChannels> {
        source.validate()?;
        let started = std::time::Instant::now();

        let fetched = self.fetch_playlist(source).await?;
        let mut channels = fetched.playlist.channels;
        if channels.is_empty() {
            return Err(SourceError::parse_empty(&source.key).into());
        }

        let epg_url = source
            .epg_override()
            .map(str::to_string)
            .or_else(|| {
                fetched
                    .playlist
                    .tvg_url
                    .as_deref()
                    .map(|tvg| UrlUtils::resolve(&fetched.url, tvg))
            })
            .unwrap_or_default();

        let index = self
            .load_epg(&epg_url, fetched.user_agent.as_deref())
            .await
            .unwrap_or_else(|e| {
                warn!("Source '{}': continuing without EPG: {}", source.key, e);
                EpgIndex::default()
            });

        let matched = match_channels(&channels, &index);
        matched.apply_logos(&mut channels);

        info!(
            "Ingested live source '{}': {} channels, {} with EPG, {} logos in {:?}",
            source.key,
            channels.len(),
            matched.epgs.len(),
            matched.epg_logos.len(),
            started.elapsed()
        );

        Ok(LiveChannels {
            channel_number: channels.len(),
            channels,
            epg_url,
            epgs: matched.epgs,
            epg_logos: matched.epg_logos,
        })
    }

    async fn fetch_playlist(&self, source: &LiveSource) -> AppResult<FetchedPlaylist> {
        let body = self
            .client
            .fetch_text(&source.url, source.user_agent_override())
            .await?;
        let content = resolve_obfuscated(&body);
        let format = detect_format(&content, &source.url, source.is_tv_box_hint());
        debug!(
            "Source '{}' ({}) detected as {}",
            source.key,
            UrlUtils::obfuscate_credentials(&source.url),
            format
        );

        let playlist = match format {
            PlaylistFormat::TvBoxJson => return self.follow_tvbox(source, &content).await,
            PlaylistFormat::M3u => parse_m3u(&source.key, &content),
            PlaylistFormat::TvBoxTxt => parse_txt(&source.key, &content),
            PlaylistFormat::Unknown => {
                debug!("Source '{}': unknown format, trying M3U", source.key);
                parse_m3u(&source.key, &content)
            }
        };

        Ok(FetchedPlaylist {
            playlist,
            url: source.url.clone(),
            user_agent: source.user_agent_override().map(str::to_string),
        })
    }

    /// Second hop for TVBox meta-configs; only the first `lives` entry counts
    async fn follow_tvbox(&self, source: &LiveSource, content: &str) -> AppResult<FetchedPlaylist> {
        let config = TvBoxConfig::from_json(content)?;
        let live = config.first_live()?;
        let url = UrlUtils::resolve(&source.url, live.url.trim());
        let user_agent = live
            .user_agent()
            .unwrap_or(&self.config.tvbox_user_agent)
            .to_string();

        debug!(
            "Source '{}': following TVBox live '{}' at {}",
            source.key,
            live.name,
            UrlUtils::obfuscate_credentials(&url)
        );

        let body = self.client.fetch_text(&url, Some(&user_agent)).await?;
        let content = resolve_obfuscated(&body);
        let playlist = match classify_playlist(&content) {
            PlaylistFormat::TvBoxTxt => parse_txt(&source.key, &content),
            _ => parse_m3u(&source.key, &content),
        };

        Ok(FetchedPlaylist {
            playlist,
            url,
            user_agent: Some(user_agent),
        })
    }

    /// EPG for the run; every failure here is `EpgUnavailable`
    async fn load_epg(&self, url: &str, user_agent: Option<&str>) -> AppResult<EpgIndex> {
        if !self.config.epg_enabled {
            return Err(SourceError::epg_unavailable("EPG disabled").into());
        }
        if url.is_empty() {
            return Err(SourceError::epg_unavailable("no EPG url").into());
        }

        let safe_url = UrlUtils::obfuscate_credentials(url);
        let unavailable = |e: AppError| -> AppError {
            SourceError::epg_unavailable(format!("{safe_url}: {e}")).into()
        };

        let stream = self
            .client
            .fetch_stream(url, user_agent)
            .await
            .map_err(&unavailable)?;
        let index = parse_epg_stream(stream).await.map_err(&unavailable)?;
        if index.is_empty() {
            return Err(SourceError::epg_unavailable(format!("{safe_url}: no EPG data")).into());
        }
        Ok(index)
    }
}
