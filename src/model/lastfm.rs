//! Wire types for the Last.fm `user.getrecenttracks` payload
//!
//! The service is loose with shapes: `track` collapses to a single object when
//! there is exactly one entry, and `artist` is a plain string or an object with
//! `#text` (or `name` in extended mode) depending on the request.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ResolveError;
use super::types::RecentTrack;

#[derive(Deserialize, Debug)]
pub struct RecentTracksResponse {
    pub recenttracks: Option<RecentTracks>,
}

#[derive(Deserialize, Debug)]
pub struct RecentTracks {
    #[serde(default)]
    pub track: OneOrMany<ScrobbleEntry>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ScrobbleEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artist: Option<ArtistField>,
    #[serde(rename = "@attr", default)]
    pub attr: Option<EntryAttr>,
    #[serde(default)]
    pub date: Option<ScrobbleDate>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ArtistField {
    Text(String),
    Object {
        #[serde(rename = "#text", default)]
        text: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl ArtistField {
    pub fn into_name(self) -> String {
        match self {
            ArtistField::Text(text) => text,
            ArtistField::Object { text, name } => text.or(name).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct EntryAttr {
    #[serde(default)]
    pub nowplaying: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ScrobbleDate {
    pub uts: String,
}

impl RecentTracksResponse {
    /// Extract the most recent entry, enforcing non-empty name and artist
    pub fn into_recent_track(self) -> Result<RecentTrack, ResolveError> {
        let entry = self
            .recenttracks
            .ok_or_else(|| ResolveError::absent("payload has no recenttracks"))?
            .track
            .into_first()
            .ok_or_else(|| ResolveError::absent("history is empty"))?;

        let name = entry.name.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Err(ResolveError::absent("most recent entry has no track name"));
        }

        let artist = entry
            .artist
            .map(ArtistField::into_name)
            .unwrap_or_default()
            .trim()
            .to_string();
        if artist.is_empty() {
            return Err(ResolveError::absent("most recent entry has no artist"));
        }

        let now_playing = entry
            .attr
            .and_then(|a| a.nowplaying)
            .is_some_and(|v| v == "true");

        let played_at = entry
            .date
            .and_then(|d| d.uts.parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        Ok(RecentTrack {
            name,
            artist,
            now_playing,
            played_at,
        })
    }
}
