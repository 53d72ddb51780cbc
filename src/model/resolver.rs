//! Track resolver: most recent scrobble -> preview clip

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{HistoryEndpoint, ResolverConfig};
use crate::error::ResolveError;
use super::itunes::SearchResponse;
use super::lastfm::RecentTracksResponse;
use super::types::{NowPlaying, PreviewMatch, RecentTrack};

/// Anything that can produce the track to play next
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// `None` means "nothing to play"; it is never an error to surface.
    async fn resolve_now_playing(&self) -> Option<NowPlaying>;
}

/// Resolves the listener's most recent scrobble to a preview clip.
///
/// Every call re-fetches both services; nothing is cached or retried.
#[derive(Clone)]
pub struct TrackResolver {
    http: Client,
    history: HistoryEndpoint,
    preview_search_url: String,
}

impl TrackResolver {
    pub fn new(config: &ResolverConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &ResolverConfig) -> Self {
        Self {
            http,
            history: config.history.clone(),
            preview_search_url: config.preview_search_url.clone(),
        }
    }

    pub async fn fetch_recent_track(&self) -> Result<RecentTrack, ResolveError> {
        let request = match &self.history {
            HistoryEndpoint::Proxy { url } => {
                crate::log_api_request!("recent_tracks", via = "proxy", url = %url);
                self.http.get(url)
            }
            HistoryEndpoint::Direct { api_url, api_key, username } => {
                crate::log_api_request!("recent_tracks", via = "direct", user = %username);
                self.http.get(api_url).query(&[
                    ("method", "user.getrecenttracks"),
                    ("user", username.as_str()),
                    ("api_key", api_key.as_str()),
                    ("format", "json"),
                    ("limit", "1"),
                ])
            }
        };

        let response: RecentTracksResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_recent_track()
    }

    pub async fn lookup_preview(&self, track: &RecentTrack) -> Result<Option<PreviewMatch>, ResolveError> {
        let term = track.search_term();
        crate::log_api_request!("preview_search", term = %term);

        let response: SearchResponse = self
            .http
            .get(&self.preview_search_url)
            .query(&[
                ("term", term.as_str()),
                ("media", "music"),
                ("entity", "song"),
                ("limit", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.into_preview())
    }

    /// Both lookups in order, with the failure kept typed
    pub async fn try_resolve(&self) -> Result<Option<NowPlaying>, ResolveError> {
        let track = self.fetch_recent_track().await?;
        tracing::debug!(track = %track.name, artist = %track.artist, "Most recent scrobble");

        let Some(preview) = self.lookup_preview(&track).await? else {
            tracing::info!(track = %track.name, artist = %track.artist, "No preview found");
            return Ok(None);
        };

        Ok(Some(NowPlaying { track, preview }))
    }
}

#[async_trait]
impl TrackSource for TrackResolver {
    async fn resolve_now_playing(&self) -> Option<NowPlaying> {
        let result = self.try_resolve().await;
        crate::log_api_result!("resolve_now_playing", result);
        result.ok().flatten()
    }
}
