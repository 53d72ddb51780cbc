//! Wire types for the iTunes Search API

use serde::Deserialize;

use super::types::PreviewMatch;

#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default, rename = "artworkUrl100")]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub track_time_millis: Option<u64>,
}

impl SearchResponse {
    /// First result with a usable preview, if any. Only the first result is
    /// considered; a later result with a preview is not a match.
    pub fn into_preview(self) -> Option<PreviewMatch> {
        let first = self.results.into_iter().next()?;
        let preview_url = first.preview_url.filter(|url| !url.is_empty())?;

        Some(PreviewMatch {
            preview_url,
            artwork_url: first.artwork_url.unwrap_or_default(),
            duration_ms: first.track_time_millis.unwrap_or(0),
        })
    }
}
