//! Playback control methods

use tokio::sync::MutexGuard;

use crate::model::{NowPlaying, PlaybackSession, PlaybackState, ResolutionTicket};

use super::PlaybackController;

impl PlaybackController {
    /// Idle: resolve and play. Playing: stop. Loading: ignored, so only one
    /// resolution is ever in flight.
    pub async fn toggle(&self) {
        let mut session = self.session.lock().await;
        let state = session.state();
        tracing::debug!(state = state.label(), "Toggling music");

        match state {
            PlaybackState::Loading => {
                tracing::debug!("Resolution already in flight, toggle ignored");
            }
            PlaybackState::Playing => self.halt(session).await,
            PlaybackState::Idle => {
                let ticket = session.begin_loading();
                drop(session);
                self.resolve_and_play(ticket).await;
            }
        }
    }

    /// Return to Idle from any state. A resolution still in flight is
    /// discarded when it completes.
    pub async fn stop(&self) {
        let session = self.session.lock().await;
        self.halt(session).await;
    }

    /// Reset under the caller's guard, then silence the output unless a newer
    /// bind got to it first.
    async fn halt(&self, mut session: MutexGuard<'_, PlaybackSession>) {
        let previous = session.reset();
        let generation = session.generation();
        drop(session);

        if previous == PlaybackState::Playing {
            if let Some(output) = self.existing_output() {
                let _bind = self.bind_lock.lock().await;
                if self.session.lock().await.generation() == generation {
                    output.stop().await;
                } else {
                    tracing::debug!("Output already rebound, leaving it playing");
                }
            }
        }
        tracing::info!(from = previous.label(), "Music stopped");
    }

    async fn resolve_and_play(&self, ticket: ResolutionTicket) {
        let Some(now_playing) = self.source.resolve_now_playing().await else {
            self.finish_idle(ticket, "nothing to play").await;
            return;
        };

        let output = match self.output().await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Audio output could not be opened");
                self.finish_idle(ticket, "output unavailable").await;
                return;
            }
        };

        // Held until this resolution is done with the output
        let _bind = self.bind_lock.lock().await;

        if !self.session.lock().await.is_current(ticket) {
            tracing::debug!(track = %now_playing.track.name, "Stopped while loading, result discarded");
            return;
        }

        let url = now_playing.preview.preview_url.clone();
        output.stop().await;
        let started = output.play(&url, ticket.bind_id()).await;

        let mut session = self.session.lock().await;
        if !session.is_current(ticket) {
            drop(session);
            if started.is_ok() {
                // No newer bind can have started while the lock is held
                tracing::debug!(url = %url, "Stopped while starting, clip halted");
                output.stop().await;
            }
            return;
        }

        match started {
            Ok(()) => {
                Self::log_started(&now_playing);
                session.start_playing(now_playing);
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "Preview playback rejected");
                session.reset();
            }
        }
    }

    async fn finish_idle(&self, ticket: ResolutionTicket, reason: &str) {
        let mut session = self.session.lock().await;
        if session.is_current(ticket) {
            tracing::info!(reason, "Returning to idle");
            session.reset();
        }
    }

    fn log_started(now_playing: &NowPlaying) {
        tracing::info!(
            track = %now_playing.track.name,
            artist = %now_playing.track.artist,
            duration_ms = now_playing.preview.duration_ms,
            url = %now_playing.preview.preview_url,
            "Preview playing"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::{Mutex, Notify, mpsc};

    use crate::audio::{AudioOutput, BindId, OutputEvent};
    use crate::controller::PlaybackController;
    use crate::error::PlaybackError;
    use crate::model::{NowPlaying, PlaybackState, PreviewMatch, RecentTrack, TrackSource};

    const CLIP: &str = "https://x/clip.m4a";

    fn sample() -> NowPlaying {
        NowPlaying {
            track: RecentTrack {
                name: "Song A".to_string(),
                artist: "Artist B".to_string(),
                now_playing: true,
                played_at: None,
            },
            preview: PreviewMatch {
                preview_url: CLIP.to_string(),
                artwork_url: "https://x/art.jpg".to_string(),
                duration_ms: 125_000,
            },
        }
    }

    /// Resolves to `result`, optionally waiting for `gate` first
    struct FakeSource {
        result: Option<NowPlaying>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl FakeSource {
        fn new(result: Option<NowPlaying>) -> Self {
            Self { result, calls: AtomicUsize::new(0), gate: None }
        }

        fn gated(result: Option<NowPlaying>, gate: Arc<Notify>) -> Self {
            Self { gate: Some(gate), ..Self::new(result) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TrackSource for FakeSource {
        async fn resolve_now_playing(&self) -> Option<NowPlaying> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone()
        }
    }

    /// Records binds and tracks which one is audible. With `first_play_gate`
    /// set, the first `play` blocks until the gate is notified.
    #[derive(Default)]
    struct FakeOutput {
        played: std::sync::Mutex<Vec<(String, BindId)>>,
        bound: std::sync::Mutex<Option<BindId>>,
        plays_entered: AtomicUsize,
        stops: AtomicUsize,
        reject: bool,
        first_play_gate: Option<Arc<Notify>>,
        events: Mutex<Option<mpsc::UnboundedReceiver<OutputEvent>>>,
    }

    impl FakeOutput {
        fn with_events(reject: bool) -> (Arc<Self>, mpsc::UnboundedSender<OutputEvent>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let output = Self {
                reject,
                events: Mutex::new(Some(rx)),
                ..Self::default()
            };
            (Arc::new(output), tx)
        }

        fn with_first_play_gate(gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                first_play_gate: Some(gate),
                ..Self::default()
            })
        }

        fn played(&self) -> Vec<String> {
            self.played.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
        }

        fn binds(&self) -> Vec<BindId> {
            self.played.lock().unwrap().iter().map(|(_, bind)| *bind).collect()
        }

        fn bound(&self) -> Option<BindId> {
            *self.bound.lock().unwrap()
        }

        fn plays_entered(&self) -> usize {
            self.plays_entered.load(Ordering::SeqCst)
        }

        fn stops(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AudioOutput for FakeOutput {
        async fn play(&self, url: &str, bind: BindId) -> Result<(), PlaybackError> {
            let entered = self.plays_entered.fetch_add(1, Ordering::SeqCst);
            if let (0, Some(gate)) = (entered, &self.first_play_gate) {
                gate.notified().await;
            }
            if self.reject {
                return Err(PlaybackError::Rejected("blocked".to_string()));
            }
            self.played.lock().unwrap().push((url.to_string(), bind));
            *self.bound.lock().unwrap() = Some(bind);
            Ok(())
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            *self.bound.lock().unwrap() = None;
        }

        async fn take_event_channel(&self) -> Option<mpsc::UnboundedReceiver<OutputEvent>> {
            self.events.lock().await.take()
        }
    }

    fn controller(source: Arc<FakeSource>, output: Arc<FakeOutput>) -> PlaybackController {
        PlaybackController::new(source, move || Ok(output.clone() as Arc<dyn AudioOutput>))
    }

    async fn wait_for(controller: &PlaybackController, state: PlaybackState) {
        for _ in 0..200 {
            if controller.state().await == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("controller never reached {state:?}");
    }

    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition never held");
    }

    #[tokio::test]
    async fn toggle_from_idle_plays_resolved_preview() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource::gated(Some(sample()), gate.clone()));
        let (output, _events) = FakeOutput::with_events(false);
        let controller = controller(source.clone(), output.clone());

        assert_eq!(controller.state().await, PlaybackState::Idle);

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_for(&controller, PlaybackState::Loading).await;
        assert!(controller.now_playing_info().await.is_none());

        gate.notify_one();
        task.await.unwrap();

        assert_eq!(controller.state().await, PlaybackState::Playing);
        assert_eq!(output.played(), vec![CLIP.to_string()]);
        assert_eq!(controller.now_playing_info().await, Some(sample()));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn toggle_while_playing_stops_without_resolving() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let (output, _events) = FakeOutput::with_events(false);
        let controller = controller(source.clone(), output.clone());

        controller.toggle().await;
        assert_eq!(controller.state().await, PlaybackState::Playing);
        let stops_before = output.stops();

        controller.toggle().await;

        assert_eq!(controller.state().await, PlaybackState::Idle);
        assert_eq!(output.stops(), stops_before + 1);
        assert_eq!(source.calls(), 1);
        assert_eq!(output.played().len(), 1);
        assert!(controller.now_playing_info().await.is_none());
    }

    #[tokio::test]
    async fn re_entrant_toggle_while_loading_is_ignored() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource::gated(Some(sample()), gate.clone()));
        let (output, _events) = FakeOutput::with_events(false);
        let controller = controller(source.clone(), output.clone());

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_for(&controller, PlaybackState::Loading).await;

        controller.toggle().await;
        controller.toggle().await;
        assert_eq!(controller.state().await, PlaybackState::Loading);

        gate.notify_one();
        first.await.unwrap();

        assert_eq!(controller.state().await, PlaybackState::Playing);
        assert_eq!(source.calls(), 1);
        assert_eq!(output.played().len(), 1);
    }

    #[tokio::test]
    async fn absent_track_returns_to_idle() {
        let source = Arc::new(FakeSource::new(None));
        let (output, _events) = FakeOutput::with_events(false);
        let controller = controller(source, output.clone());

        controller.toggle().await;

        assert_eq!(controller.state().await, PlaybackState::Idle);
        assert!(output.played().is_empty());
    }

    #[tokio::test]
    async fn rejected_playback_returns_to_idle() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let (output, _events) = FakeOutput::with_events(true);
        let controller = controller(source, output);

        controller.toggle().await;

        assert_eq!(controller.state().await, PlaybackState::Idle);
        assert!(controller.now_playing_info().await.is_none());
    }

    #[tokio::test]
    async fn unavailable_output_returns_to_idle() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let controller = PlaybackController::new(source, || {
            Err(PlaybackError::Unavailable("no device".to_string()))
        });

        controller.toggle().await;

        assert_eq!(controller.state().await, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn stop_while_loading_discards_resolution() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource::gated(Some(sample()), gate.clone()));
        let (output, _events) = FakeOutput::with_events(false);
        let controller = controller(source, output.clone());

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_for(&controller, PlaybackState::Loading).await;

        controller.stop().await;
        assert_eq!(controller.state().await, PlaybackState::Idle);

        gate.notify_one();
        task.await.unwrap();

        assert_eq!(controller.state().await, PlaybackState::Idle);
        assert!(output.played().is_empty());
    }

    #[tokio::test]
    async fn end_of_clip_returns_to_idle() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let (output, events) = FakeOutput::with_events(false);
        let controller = controller(source, output.clone());

        controller.toggle().await;
        assert_eq!(controller.state().await, PlaybackState::Playing);

        events.send(OutputEvent::Ended { bind: output.binds()[0] }).unwrap();
        wait_for(&controller, PlaybackState::Idle).await;
        assert!(controller.now_playing_info().await.is_none());
    }

    #[tokio::test]
    async fn end_of_earlier_bind_of_same_clip_is_ignored() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let (output, events) = FakeOutput::with_events(false);
        let controller = controller(source, output.clone());

        controller.toggle().await;
        controller.toggle().await;
        controller.toggle().await;
        assert_eq!(output.played(), vec![CLIP.to_string(), CLIP.to_string()]);
        let binds = output.binds();
        assert_ne!(binds[0], binds[1]);

        events.send(OutputEvent::Ended { bind: binds[0] }).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.state().await, PlaybackState::Playing);

        events.send(OutputEvent::Ended { bind: binds[1] }).unwrap();
        wait_for(&controller, PlaybackState::Idle).await;
    }

    #[tokio::test]
    async fn stale_bind_never_silences_the_next_clip() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource::new(Some(sample())));
        let output = FakeOutput::with_first_play_gate(gate.clone());
        let controller = controller(source.clone(), output.clone());

        let stale = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_until(|| output.plays_entered() == 1).await;

        controller.stop().await;
        assert_eq!(controller.state().await, PlaybackState::Idle);

        let fresh = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_until(|| source.calls() == 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        // The newer resolution waits for the stale bind to finish
        assert_eq!(output.plays_entered(), 1);
        assert_eq!(controller.state().await, PlaybackState::Loading);

        gate.notify_one();
        stale.await.unwrap();
        fresh.await.unwrap();

        assert_eq!(controller.state().await, PlaybackState::Playing);
        let binds = output.binds();
        assert_eq!(binds.len(), 2);
        assert_eq!(output.bound(), Some(binds[1]));
        assert_eq!(controller.now_playing_info().await, Some(sample()));
    }

    #[tokio::test]
    async fn stop_while_starting_halts_the_clip() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource::new(Some(sample())));
        let output = FakeOutput::with_first_play_gate(gate.clone());
        let controller = controller(source, output.clone());

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_until(|| output.plays_entered() == 1).await;

        controller.stop().await;
        gate.notify_one();
        task.await.unwrap();

        assert_eq!(controller.state().await, PlaybackState::Idle);
        assert_eq!(output.played().len(), 1);
        assert_eq!(output.bound(), None);
        assert!(controller.now_playing_info().await.is_none());
    }

    #[tokio::test]
    async fn stop_leaves_a_newer_bind_playing() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let (output, _events) = FakeOutput::with_events(false);
        let controller = controller(source, output.clone());

        controller.toggle().await;
        assert_eq!(output.stops(), 1);

        // Stand in for a bind that is still using the output
        let busy = controller.bind_lock.lock().await;

        let stopping = tokio::spawn({
            let controller = controller.clone();
            async move { controller.stop().await }
        });
        wait_for(&controller, PlaybackState::Idle).await;

        let restarting = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_for(&controller, PlaybackState::Loading).await;

        drop(busy);
        stopping.await.unwrap();
        restarting.await.unwrap();

        assert_eq!(controller.state().await, PlaybackState::Playing);
        // Only the stop-before-rebind of each bind reached the output
        assert_eq!(output.stops(), 2);
        assert_eq!(output.bound(), output.binds().last().copied());
    }

    #[tokio::test]
    async fn toggle_off_never_cancels_the_next_resolution() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let (output, events) = FakeOutput::with_events(false);
        let controller = controller(source.clone(), output.clone());

        controller.toggle().await;
        let first = output.binds()[0];
        let busy = controller.bind_lock.lock().await;

        let toggling_off = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_for(&controller, PlaybackState::Idle).await;

        events.send(OutputEvent::Ended { bind: first }).unwrap();
        let toggling_on = tokio::spawn({
            let controller = controller.clone();
            async move { controller.toggle().await }
        });
        wait_until(|| source.calls() == 2).await;
        assert_eq!(controller.state().await, PlaybackState::Loading);

        drop(busy);
        toggling_off.await.unwrap();
        toggling_on.await.unwrap();

        assert_eq!(controller.state().await, PlaybackState::Playing);
        assert_eq!(output.bound(), output.binds().last().copied());
    }

    #[tokio::test]
    async fn output_is_built_once_and_stopped_before_rebind() {
        let source = Arc::new(FakeSource::new(Some(sample())));
        let (output, _events) = FakeOutput::with_events(false);
        let built = Arc::new(AtomicUsize::new(0));
        let controller = PlaybackController::new(source, {
            let output = output.clone();
            let built = built.clone();
            move || {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(output.clone() as Arc<dyn AudioOutput>)
            }
        });

        assert!(controller.existing_output().is_none());

        controller.toggle().await;
        controller.toggle().await;
        controller.toggle().await;

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(output.played().len(), 2);
        // stop-before-rebind twice, plus the stop from the middle toggle
        assert_eq!(output.stops(), 3);
    }
}
