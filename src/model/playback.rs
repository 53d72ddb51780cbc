//! Playback session state owned by the controller

use std::time::Instant;

use super::types::{NowPlaying, PlaybackState};

/// Identifies one Idle -> Loading resolution. A result is only applied if its
/// ticket is still current when it arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolutionTicket(u64);

impl ResolutionTicket {
    /// Generation handed to the output when this resolution binds a clip
    pub fn bind_id(self) -> u64 {
        self.0
    }
}

/// The controller's single mutable record
#[derive(Debug, Default)]
pub struct PlaybackSession {
    state: PlaybackState,
    now_playing: Option<NowPlaying>,
    started_at: Option<Instant>,
    epoch: u64,
}

impl PlaybackSession {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    /// Idle -> Loading. Invalidates any earlier ticket.
    pub fn begin_loading(&mut self) -> ResolutionTicket {
        self.epoch += 1;
        self.state = PlaybackState::Loading;
        self.now_playing = None;
        self.started_at = None;
        ResolutionTicket(self.epoch)
    }

    pub fn is_current(&self, ticket: ResolutionTicket) -> bool {
        self.state == PlaybackState::Loading && self.epoch == ticket.0
    }

    /// Loading -> Playing
    pub fn start_playing(&mut self, now_playing: NowPlaying) {
        self.state = PlaybackState::Playing;
        self.now_playing = Some(now_playing);
        self.started_at = Some(Instant::now());
    }

    /// Any state -> Idle. Returns the state that was left.
    pub fn reset(&mut self) -> PlaybackState {
        let previous = self.state;
        self.epoch += 1;
        self.state = PlaybackState::Idle;
        self.now_playing = None;
        self.started_at = None;
        previous
    }

    /// Bumped on every transition out of Idle and on every reset
    pub fn generation(&self) -> u64 {
        self.epoch
    }

    /// Whether `bind` is the generation currently loading or playing. Every
    /// reset bumps the epoch, so an Idle session owns no bind.
    pub fn owns_bind(&self, bind: u64) -> bool {
        self.state != PlaybackState::Idle && self.epoch == bind
    }

    pub fn info(&self) -> PlaybackInfo {
        let duration_ms = self
            .now_playing
            .as_ref()
            .map(|n| n.preview.duration_ms)
            .unwrap_or(0);

        // Previews are cut well short of the catalogue duration, so the
        // elapsed time is only clamped, never used to detect the end.
        let progress_ms = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
            .min(duration_ms);

        PlaybackInfo {
            state: self.state,
            now_playing: self.now_playing.clone(),
            progress_ms,
            duration_ms,
        }
    }
}

/// Snapshot of the playback state for rendering
#[derive(Clone, Debug, Default)]
pub struct PlaybackInfo {
    pub state: PlaybackState,
    pub now_playing: Option<NowPlaying>,
    pub progress_ms: u64,
    pub duration_ms: u64,
}
