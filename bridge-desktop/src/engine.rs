//! Headless Playback Engine
//!
//! Tracks the queue and transport state the way a real player would, without
//! decoding or output. Listener callbacks fire synchronously from the mutating
//! call, i.e. on the thread that owns the engine.

use bridge_traits::{
    error::{BridgeError, Result},
    playback::{
        EngineEvent, EngineListener, EngineOptions, ListenerId, MediaItemRef, PlaybackEngine,
        PlaybackEngineFactory, PlaybackState,
    },
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Builds [`HeadlessPlaybackEngine`] instances.
#[derive(Debug, Clone, Default)]
pub struct HeadlessEngineFactory {
    failure: Option<String>,
}

impl HeadlessEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose `create` always fails with `reason`.
    ///
    /// Mirrors a platform that rejects the requested audio configuration.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
        }
    }
}

impl PlaybackEngineFactory for HeadlessEngineFactory {
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn PlaybackEngine>> {
        if let Some(reason) = &self.failure {
            return Err(BridgeError::NotAvailable(reason.clone()));
        }

        debug!(
            handle_audio_focus = options.handle_audio_focus,
            skip_silence = options.skip_silence,
            "Creating headless playback engine"
        );
        Ok(Box::new(HeadlessPlaybackEngine::new(*options)))
    }
}

/// Queue/transport state machine implementing [`PlaybackEngine`].
pub struct HeadlessPlaybackEngine {
    options: EngineOptions,
    listeners: Vec<(ListenerId, Arc<dyn EngineListener>)>,
    next_listener_id: u64,
    queue: Vec<MediaItemRef>,
    index: Option<usize>,
    position: Duration,
    state: PlaybackState,
    play_when_ready: bool,
    released: bool,
}

impl HeadlessPlaybackEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            listeners: Vec::new(),
            next_listener_id: 1,
            queue: Vec::new(),
            index: None,
            position: Duration::ZERO,
            state: PlaybackState::Idle,
            play_when_ready: false,
            released: false,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn notify(&self, event: EngineEvent) {
        trace!(?event, listeners = self.listeners.len(), "Engine event");
        for (_, listener) in &self.listeners {
            listener.on_event(&event);
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.notify(EngineEvent::PlaybackStateChanged(state));
        }
    }

    /// Applies a transport change and reports `IsPlayingChanged` when the
    /// effective flag flipped.
    fn transition(&mut self, state: PlaybackState, play_when_ready: bool) {
        let was_playing = self.is_playing();
        self.play_when_ready = play_when_ready;
        self.set_state(state);
        let playing = self.is_playing();
        if playing != was_playing {
            self.notify(EngineEvent::IsPlayingChanged(playing));
        }
    }

    fn move_to(&mut self, index: Option<usize>) {
        self.position = Duration::ZERO;
        if self.index != index {
            self.index = index;
            self.notify(EngineEvent::MediaItemTransition {
                item: self.current_media_item(),
            });
        }
    }
}

impl PlaybackEngine for HeadlessPlaybackEngine {
    fn add_listener(&mut self, listener: Arc<dyn EngineListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn play(&mut self) {
        let state = if self.index.is_some() {
            PlaybackState::Ready
        } else {
            self.state
        };
        self.transition(state, true);
    }

    fn pause(&mut self) {
        self.transition(self.state, false);
    }

    fn stop(&mut self) {
        self.position = Duration::ZERO;
        self.transition(PlaybackState::Idle, false);
    }

    fn seek_to(&mut self, position: Duration) {
        if self.index.is_some() {
            self.position = position;
        }
    }

    fn seek_to_next(&mut self) {
        if let Some(index) = self.index {
            if index + 1 < self.queue.len() {
                self.move_to(Some(index + 1));
            } else {
                self.transition(PlaybackState::Ended, self.play_when_ready);
            }
        }
    }

    fn seek_to_previous(&mut self) {
        match self.index {
            Some(index) if index > 0 && self.position.is_zero() => self.move_to(Some(index - 1)),
            Some(_) => self.position = Duration::ZERO,
            None => {}
        }
    }

    fn set_media_items(&mut self, items: Vec<MediaItemRef>, start_index: usize) {
        self.queue = items;
        let index = if self.queue.is_empty() {
            None
        } else {
            Some(start_index.min(self.queue.len() - 1))
        };
        // Replacing the queue always reports a transition, even to the same index.
        self.index = None;
        self.move_to(index);
        let state = if index.is_some() {
            PlaybackState::Ready
        } else {
            PlaybackState::Idle
        };
        self.transition(state, self.play_when_ready);
    }

    fn current_media_item(&self) -> Option<MediaItemRef> {
        self.index.and_then(|index| self.queue.get(index).cloned())
    }

    fn next_media_item(&self) -> Option<MediaItemRef> {
        self.index.and_then(|index| self.queue.get(index + 1).cloned())
    }

    fn is_playing(&self) -> bool {
        self.play_when_ready && self.state == PlaybackState::Ready
    }

    fn playback_state(&self) -> PlaybackState {
        self.state
    }

    fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        debug!(queued = self.queue.len(), "Releasing headless playback engine");
        self.listeners.clear();
        self.queue.clear();
        self.index = None;
        self.state = PlaybackState::Idle;
        self.play_when_ready = false;
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<EngineEvent>>,
    }

    impl EngineListener for Recorder {
        fn on_event(&self, event: &EngineEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn queue() -> Vec<MediaItemRef> {
        vec![
            MediaItemRef::new("a"),
            MediaItemRef::new("b"),
            MediaItemRef::new("c"),
        ]
    }

    #[test]
    fn test_failing_factory() {
        let factory = HeadlessEngineFactory::failing("no output device");
        let err = factory.create(&EngineOptions::default()).err().unwrap();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }

    #[test]
    fn test_factory_passes_options() {
        let options = EngineOptions {
            skip_silence: true,
            ..EngineOptions::default()
        };
        let engine = HeadlessPlaybackEngine::new(options);
        assert!(engine.options().skip_silence);
    }

    #[test]
    fn test_queue_navigation() {
        let mut engine = HeadlessPlaybackEngine::new(EngineOptions::default());
        engine.set_media_items(queue(), 0);

        assert_eq!(engine.current_media_item().unwrap().media_id, "a");
        assert_eq!(engine.next_media_item().unwrap().media_id, "b");

        engine.seek_to_next();
        engine.seek_to_next();
        assert_eq!(engine.current_media_item().unwrap().media_id, "c");
        assert_eq!(engine.next_media_item(), None);

        engine.seek_to_next();
        assert_eq!(engine.playback_state(), PlaybackState::Ended);

        engine.seek_to_previous();
        assert_eq!(engine.current_media_item().unwrap().media_id, "b");
    }

    #[test]
    fn test_seek_previous_restarts_item_first() {
        let mut engine = HeadlessPlaybackEngine::new(EngineOptions::default());
        engine.set_media_items(queue(), 1);
        engine.seek_to(Duration::from_secs(30));

        engine.seek_to_previous();
        assert_eq!(engine.current_media_item().unwrap().media_id, "b");
        assert_eq!(engine.position(), Duration::ZERO);
    }

    #[test]
    fn test_start_index_is_clamped() {
        let mut engine = HeadlessPlaybackEngine::new(EngineOptions::default());
        engine.set_media_items(queue(), 10);
        assert_eq!(engine.current_media_item().unwrap().media_id, "c");
    }

    #[test]
    fn test_listener_notifications() {
        let mut engine = HeadlessPlaybackEngine::new(EngineOptions::default());
        let recorder = Arc::new(Recorder::default());
        let id = engine.add_listener(recorder.clone());

        engine.set_media_items(queue(), 0);
        engine.play();
        engine.pause();

        let events = recorder.events.lock().clone();
        assert_eq!(
            events,
            vec![
                EngineEvent::MediaItemTransition {
                    item: Some(MediaItemRef::new("a"))
                },
                EngineEvent::PlaybackStateChanged(PlaybackState::Ready),
                EngineEvent::IsPlayingChanged(true),
                EngineEvent::IsPlayingChanged(false),
            ]
        );

        assert!(engine.remove_listener(id));
        assert!(!engine.remove_listener(id));
        engine.play();
        assert_eq!(recorder.events.lock().len(), 4);
    }

    #[test]
    fn test_release_clears_state() {
        let mut engine = HeadlessPlaybackEngine::new(EngineOptions::default());
        engine.add_listener(Arc::new(Recorder::default()));
        engine.set_media_items(queue(), 0);
        engine.play();

        engine.release();
        assert!(engine.is_released());
        assert_eq!(engine.listener_count(), 0);
        assert!(!engine.is_playing());
        assert_eq!(engine.current_media_item(), None);
    }
}
