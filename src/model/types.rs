//! Core type definitions for the now-playing flow

use chrono::{DateTime, Utc};

/// Observable state of the playback controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Loading => "Loading",
            PlaybackState::Playing => "Playing",
        }
    }
}

/// The listener's most recent scrobble
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecentTrack {
    pub name: String,
    pub artist: String,
    /// The history service flags the entry as currently playing
    pub now_playing: bool,
    /// When the scrobble was recorded; absent for an in-progress play
    pub played_at: Option<DateTime<Utc>>,
}

impl RecentTrack {
    /// Free-text query used for the preview lookup
    pub fn search_term(&self) -> String {
        format!("{} {}", self.name, self.artist)
    }
}

/// First preview search result for a track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewMatch {
    pub preview_url: String,
    pub artwork_url: String,
    pub duration_ms: u64,
}

/// A resolved track ready to be played
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlaying {
    pub track: RecentTrack,
    pub preview: PreviewMatch,
}
