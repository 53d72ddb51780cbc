//! Audio output for preview clips
//!
//! The controller talks to the output through [`AudioOutput`] only. The rodio
//! backend keeps its stream on a dedicated thread since rodio's stream handle
//! cannot cross threads; commands go in over a channel and natural
//! end-of-clip events come back out.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::PlaybackError;

#[cfg(feature = "playback")]
pub use rodio_backend::RodioOutput;

/// Signals raised by the output without a caller asking
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    /// The clip started by `play(_, bind)` played to its end
    Ended { bind: BindId },
}

/// Generation number the controller attaches to each `play` call
pub type BindId = u64;

#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Replace the current source with `url` and start it. Resolves once the
    /// clip is actually playing. `bind` is echoed back in its `Ended` event.
    async fn play(&self, url: &str, bind: BindId) -> Result<(), PlaybackError>;

    /// Stop and drop the current source, if any. Never raises `Ended`.
    async fn stop(&self);

    /// Event stream; only the first caller gets it
    async fn take_event_channel(&self) -> Option<UnboundedReceiver<OutputEvent>>;
}

/// Stand-in for builds without the `playback` feature: rejects every clip
pub struct UnavailableOutput;

#[async_trait]
impl AudioOutput for UnavailableOutput {
    async fn play(&self, url: &str, _bind: BindId) -> Result<(), PlaybackError> {
        tracing::debug!(url, "Audio output unavailable");
        Err(PlaybackError::Unavailable(
            "built without the `playback` feature".to_string(),
        ))
    }

    async fn stop(&self) {}

    async fn take_event_channel(&self) -> Option<UnboundedReceiver<OutputEvent>> {
        None
    }
}

#[cfg(feature = "playback")]
mod rodio_backend {
    use std::io::Cursor;
    use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
    use std::thread;
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::Client;
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use tokio::sync::{Mutex, mpsc, oneshot};

    use super::{AudioOutput, BindId, OutputEvent};
    use crate::error::PlaybackError;

    const END_POLL_INTERVAL: Duration = Duration::from_millis(100);
    const PREVIEW_VOLUME: f32 = 0.8;

    enum OutputCommand {
        Play {
            url: String,
            bind: BindId,
            bytes: Vec<u8>,
            reply: oneshot::Sender<Result<(), PlaybackError>>,
        },
        Stop,
    }

    pub struct RodioOutput {
        http: Client,
        commands: std_mpsc::Sender<OutputCommand>,
        events: Mutex<Option<mpsc::UnboundedReceiver<OutputEvent>>>,
    }

    impl RodioOutput {
        /// Open the default output device. Blocks until the output thread
        /// reports whether the device could be opened.
        pub fn new(http: Client) -> Result<Self, PlaybackError> {
            let (command_tx, command_rx) = std_mpsc::channel();
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let (ready_tx, ready_rx) = std_mpsc::channel();

            thread::Builder::new()
                .name("audio-output".to_string())
                .spawn(move || run_output_thread(command_rx, event_tx, ready_tx))
                .map_err(|e| PlaybackError::Unavailable(e.to_string()))?;

            ready_rx
                .recv()
                .map_err(|_| PlaybackError::Unavailable("output thread exited".to_string()))??;

            tracing::info!("Audio output initialized");

            Ok(Self {
                http,
                commands: command_tx,
                events: Mutex::new(Some(event_rx)),
            })
        }

        fn send(&self, command: OutputCommand) -> Result<(), PlaybackError> {
            self.commands
                .send(command)
                .map_err(|_| PlaybackError::Unavailable("output thread has stopped".to_string()))
        }
    }

    #[async_trait]
    impl AudioOutput for RodioOutput {
        async fn play(&self, url: &str, bind: BindId) -> Result<(), PlaybackError> {
            let bytes = self
                .http
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            tracing::debug!(url, size = bytes.len(), "Preview clip downloaded");

            let (reply, response) = oneshot::channel();
            self.send(OutputCommand::Play {
                url: url.to_string(),
                bind,
                bytes: bytes.to_vec(),
                reply,
            })?;

            response
                .await
                .map_err(|_| PlaybackError::Unavailable("output thread has stopped".to_string()))?
        }

        async fn stop(&self) {
            if self.send(OutputCommand::Stop).is_err() {
                tracing::warn!("Stop requested but the output thread is gone");
            }
        }

        async fn take_event_channel(&self) -> Option<mpsc::UnboundedReceiver<OutputEvent>> {
            self.events.lock().await.take()
        }
    }

    struct ActiveClip {
        sink: Sink,
        url: String,
        bind: BindId,
    }

    fn run_output_thread(
        commands: std_mpsc::Receiver<OutputCommand>,
        events: mpsc::UnboundedSender<OutputEvent>,
        ready: std_mpsc::Sender<Result<(), PlaybackError>>,
    ) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(pair) => {
                let _ = ready.send(Ok(()));
                pair
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to open audio output");
                let _ = ready.send(Err(PlaybackError::Unavailable(e.to_string())));
                return;
            }
        };

        let mut active: Option<ActiveClip> = None;

        loop {
            match commands.recv_timeout(END_POLL_INTERVAL) {
                Ok(OutputCommand::Play { url, bind, bytes, reply }) => {
                    if let Some(previous) = active.take() {
                        tracing::debug!(url = %previous.url, bind = previous.bind, "Replacing active clip");
                        previous.sink.stop();
                    }
                    let result = match start_clip(&handle, bytes) {
                        Ok(sink) => {
                            active = Some(ActiveClip { sink, url, bind });
                            Ok(())
                        }
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(result);
                }
                Ok(OutputCommand::Stop) => {
                    if let Some(clip) = active.take() {
                        tracing::debug!(url = %clip.url, bind = clip.bind, "Clip stopped");
                        clip.sink.stop();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if active.as_ref().is_some_and(|clip| clip.sink.empty()) {
                        if let Some(clip) = active.take() {
                            tracing::debug!(url = %clip.url, bind = clip.bind, "Clip ended");
                            let _ = events.send(OutputEvent::Ended { bind: clip.bind });
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::debug!("Audio output thread shutting down");
    }

    fn start_clip(handle: &OutputStreamHandle, bytes: Vec<u8>) -> Result<Sink, PlaybackError> {
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| PlaybackError::Rejected(format!("undecodable clip: {e}")))?;
        let sink = Sink::try_new(handle).map_err(|e| PlaybackError::Rejected(e.to_string()))?;
        sink.set_volume(PREVIEW_VOLUME);
        sink.append(source);
        sink.play();
        Ok(sink)
    }
}
