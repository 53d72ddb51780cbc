//! Error taxonomy for the now-playing flow
//!
//! Neither error type is ever surfaced to the user: the resolver turns
//! `ResolveError` into "nothing to play" and the controller turns
//! `PlaybackError` into a return to idle. They exist so the failure paths are
//! typed and logged instead of silently swallowed.

/// Failure while resolving the listener's most recent track to a preview clip
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// Request rejected, timed out, returned a non-success status or an
    /// unparseable body
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// Well-formed response that is missing required data
    #[error("data absent: {0}")]
    DataAbsent(String),
}

impl ResolveError {
    pub fn absent(what: impl Into<String>) -> Self {
        Self::DataAbsent(what.into())
    }
}

/// Failure while binding a preview clip to the audio output
#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("failed to fetch preview audio: {0}")]
    Fetch(#[from] reqwest::Error),

    /// No output device could be opened
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    /// The output refused to start the clip (undecodable data, sink error)
    #[error("playback rejected: {0}")]
    Rejected(String),
}
