//! Listener for events raised by the audio output

use tokio::sync::mpsc::UnboundedReceiver;

use crate::audio::{BindId, OutputEvent};
use super::PlaybackController;

impl PlaybackController {
    pub(crate) fn start_output_event_listener(&self, mut events: UnboundedReceiver<OutputEvent>) {
        let controller = self.clone();
        tracing::info!("Starting audio output event listener");

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    OutputEvent::Ended { bind } => controller.on_clip_ended(bind).await,
                }
            }
            tracing::debug!("Audio output event listener shutting down");
        });
    }

    /// Natural end of the bound clip: back to Idle. Ends of clips from an
    /// earlier bind are ignored, even when the same URL was bound again.
    pub(crate) async fn on_clip_ended(&self, bind: BindId) {
        let mut session = self.session.lock().await;
        if session.owns_bind(bind) {
            session.reset();
            tracing::info!(bind, "Preview finished");
        } else {
            tracing::trace!(bind, "End of a clip that is no longer bound");
        }
    }
}
