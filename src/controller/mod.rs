//! Controller module - playback state machine and event handling
//!
//! - `playback`: toggle/stop and the resolution flow
//! - `output_events`: Listener for end-of-clip events from the audio output
//! - `input`: Key event handling for the terminal card

mod input;
mod playback;
mod output_events;

pub use input::InputOutcome;

use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::audio::AudioOutput;
use crate::error::PlaybackError;
use crate::model::{NowPlaying, PlaybackInfo, PlaybackSession, PlaybackState, TrackSource};

pub type OutputFactory = dyn Fn() -> Result<Arc<dyn AudioOutput>, PlaybackError> + Send + Sync;

/// Owns the one audio output of the process and drives it from a
/// [`TrackSource`]. Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct PlaybackController {
    pub(crate) session: Arc<Mutex<PlaybackSession>>,
    source: Arc<dyn TrackSource>,
    output: Arc<OnceCell<Arc<dyn AudioOutput>>>,
    make_output: Arc<OutputFactory>,
    /// Held by whoever is writing to the output, so a stale bind always
    /// finishes before a newer one starts
    bind_lock: Arc<Mutex<()>>,
}

impl PlaybackController {
    /// `make_output` runs at most once successfully, on the first clip bound.
    pub fn new<F>(source: Arc<dyn TrackSource>, make_output: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn AudioOutput>, PlaybackError> + Send + Sync + 'static,
    {
        Self {
            session: Arc::new(Mutex::new(PlaybackSession::default())),
            source,
            output: Arc::new(OnceCell::new()),
            make_output: Arc::new(make_output),
            bind_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn state(&self) -> PlaybackState {
        self.session.lock().await.state()
    }

    pub async fn now_playing_info(&self) -> Option<NowPlaying> {
        self.session.lock().await.now_playing().cloned()
    }

    pub async fn snapshot(&self) -> PlaybackInfo {
        self.session.lock().await.info()
    }

    /// The shared output, built on first use. The event listener is started
    /// the first time the output comes up.
    pub(crate) async fn output(&self) -> Result<Arc<dyn AudioOutput>, PlaybackError> {
        let output = self
            .output
            .get_or_try_init(|| async {
                let output = (self.make_output)()?;
                if let Some(events) = output.take_event_channel().await {
                    self.start_output_event_listener(events);
                }
                Ok::<_, PlaybackError>(output)
            })
            .await?;
        Ok(output.clone())
    }

    /// The output if it was ever built; never constructs one
    pub(crate) fn existing_output(&self) -> Option<Arc<dyn AudioOutput>> {
        self.output.get().cloned()
    }
}
