//! Model module - now-playing data and resolution
//!
//! - `types`: Core type definitions (playback state, tracks, previews)
//! - `lastfm`: Scrobble history payload
//! - `itunes`: Preview search payload
//! - `resolver`: Track resolver (history lookup -> preview lookup)
//! - `playback`: Playback session state owned by the controller

mod types;
mod lastfm;
mod itunes;
mod resolver;
mod playback;

pub use types::{NowPlaying, PlaybackState, PreviewMatch, RecentTrack};

pub use resolver::{TrackResolver, TrackSource};

pub use playback::{PlaybackInfo, PlaybackSession, ResolutionTicket};
