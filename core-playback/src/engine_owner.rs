//! # Playback Engine Owner
//!
//! Builds the engine on the executor thread, registers the snapshot listener
//! before anything else can reach the engine, and tears both down in order.

use crate::error::{PlaybackError, Result};
use crate::executor::{CommandExecutor, CommandSender};
use crate::snapshot::StateSnapshot;

use bridge_traits::playback::{
    EngineEvent, EngineListener, EngineOptions, ListenerId, PlaybackEngine, PlaybackEngineFactory,
};
use core_runtime::events::{EventBus, PlaybackEvent, ServiceEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use tracing::{debug, info, trace, warn};

/// Read the engine and publish the result.
///
/// Must run on the executor thread. Returns whether the snapshot changed.
pub(crate) fn update_playback_info(
    engine: &dyn PlaybackEngine,
    snapshot: &StateSnapshot,
    events: &EventBus,
) -> bool {
    let changed = snapshot.update(
        engine.is_playing_or_buffering(),
        engine.current_media_item(),
        engine.next_media_item(),
    );

    if changed {
        let view = snapshot.read();
        trace!(
            is_playing = view.is_playing,
            current = ?view.current_media_id(),
            "Now playing changed"
        );
        let _ = events.emit(ServiceEvent::Playback(PlaybackEvent::NowPlayingChanged {
            is_playing: view.is_playing,
            current_media_id: view.current_media_id().map(str::to_string),
            next_media_id: view.next_media_id().map(str::to_string),
        }));
    }

    changed
}

/// Engine listener that keeps the [`StateSnapshot`] current.
///
/// Engines may call back while they are mid-mutation (and from their own
/// threads), so the listener never touches the engine directly; it queues a
/// refresh command instead.
pub struct SnapshotListener {
    commands: CommandSender,
    snapshot: Arc<StateSnapshot>,
    events: EventBus,
    detached: AtomicBool,
}

impl SnapshotListener {
    fn new(commands: CommandSender, snapshot: Arc<StateSnapshot>, events: EventBus) -> Self {
        Self {
            commands,
            snapshot,
            events,
            detached: AtomicBool::new(false),
        }
    }

    /// Ignore every callback from now on.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn refresh(&self) {
        let snapshot = Arc::clone(&self.snapshot);
        let events = self.events.clone();
        let submitted = self
            .commands
            .submit(move |engine| {
                update_playback_info(engine, &snapshot, &events);
            });

        if let Err(err) = submitted {
            debug!(error = %err, "Dropping snapshot refresh");
        }
    }
}

impl EngineListener for SnapshotListener {
    fn on_event(&self, event: &EngineEvent) {
        if self.is_detached() {
            trace!(?event, "Event after listener was detached");
            return;
        }

        match event {
            EngineEvent::PlayerError { message } => {
                warn!(error = %message, "Playback engine reported an error");
                let _ = self
                    .events
                    .emit(ServiceEvent::Playback(PlaybackEvent::EngineError {
                        message: message.clone(),
                    }));
            }
            event if event.affects_now_playing() => self.refresh(),
            _ => {}
        }
    }
}

/// Sole owner of the playback engine and its executor thread.
pub struct PlaybackEngineOwner {
    executor: CommandExecutor,
    listener: Arc<SnapshotListener>,
    listener_id: ListenerId,
    snapshot: Arc<StateSnapshot>,
    events: EventBus,
}

impl PlaybackEngineOwner {
    /// Spawn the executor and build the engine on it.
    ///
    /// Fails with [`PlaybackError::EngineConstruction`] if the factory rejects
    /// `options`.
    pub async fn initialize(
        factory: Arc<dyn PlaybackEngineFactory>,
        options: EngineOptions,
        snapshot: Arc<StateSnapshot>,
        events: EventBus,
        thread_name: &str,
    ) -> Result<Self> {
        let init_snapshot = Arc::clone(&snapshot);
        let init_events = events.clone();
        let (executor, (listener, listener_id)) =
            CommandExecutor::spawn(thread_name, move |commands| {
                let mut engine = factory
                    .create(&options)
                    .map_err(|err| PlaybackError::EngineConstruction(err.to_string()))?;

                let listener = Arc::new(SnapshotListener::new(
                    commands.clone(),
                    Arc::clone(&init_snapshot),
                    init_events.clone(),
                ));
                let listener_id = engine.add_listener(listener.clone());
                update_playback_info(engine.as_ref(), &init_snapshot, &init_events);

                Ok((engine, (listener, listener_id)))
            })
            .await?;

        info!(
            skip_silence = options.skip_silence,
            handle_audio_focus = options.handle_audio_focus,
            "Playback engine initialized"
        );

        Ok(Self {
            executor,
            listener,
            listener_id,
            snapshot,
            events,
        })
    }

    pub fn commands(&self) -> CommandSender {
        self.executor.sender()
    }

    pub fn snapshot(&self) -> &Arc<StateSnapshot> {
        &self.snapshot
    }

    pub fn thread_id(&self) -> ThreadId {
        self.executor.thread_id()
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    pub fn is_shut_down(&self) -> bool {
        self.executor.is_shut_down()
    }

    /// Publish the final engine state, detach the listener and release the
    /// engine on its thread, after every queued command, then join the thread.
    ///
    /// Refreshes requested by commands that ran after the queue closed are
    /// dropped, so the finalizer reads the engine one last time itself.
    pub async fn shutdown(&self) -> Result<bool> {
        let listener_id = self.listener_id;
        let snapshot = Arc::clone(&self.snapshot);
        let events = self.events.clone();
        self.executor
            .shutdown(move |engine| {
                update_playback_info(engine, &snapshot, &events);
                if !engine.remove_listener(listener_id) {
                    warn!(?listener_id, "Snapshot listener was not registered");
                }
                engine.release();
                debug!("Playback engine released");
            })
            .await
    }

    /// Disarm the listener so late callbacks from engine-internal threads are
    /// ignored.
    pub fn clear_listener(&self) {
        self.listener.detach();
    }

    pub fn is_listener_cleared(&self) -> bool {
        self.listener.is_detached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::HeadlessEngineFactory;
    use bridge_traits::playback::MediaItemRef;
    use std::thread;
    use std::time::Duration;

    async fn owner_with(snapshot: Arc<StateSnapshot>, events: EventBus) -> PlaybackEngineOwner {
        PlaybackEngineOwner::initialize(
            Arc::new(HeadlessEngineFactory::new()),
            EngineOptions::default(),
            snapshot,
            events,
            "owner-test",
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_factory_failure_is_engine_construction() {
        let result = PlaybackEngineOwner::initialize(
            Arc::new(HeadlessEngineFactory::failing("unsupported sample rate")),
            EngineOptions::default(),
            Arc::new(StateSnapshot::new()),
            EventBus::new(8),
            "owner-test",
        )
        .await;

        match result {
            Err(PlaybackError::EngineConstruction(message)) => {
                assert!(message.contains("unsupported sample rate"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("engine construction should fail"),
        }
    }

    #[tokio::test]
    async fn test_engine_events_refresh_snapshot() {
        let snapshot = Arc::new(StateSnapshot::new());
        let events = EventBus::new(32);
        let mut stream = events.stream();
        let owner = owner_with(Arc::clone(&snapshot), events).await;

        let commands = owner.commands();
        commands
            .submit_and_wait(|engine| {
                engine.set_media_items(
                    vec![MediaItemRef::new("intro"), MediaItemRef::new("verse")],
                    0,
                );
                engine.play();
            })
            .await
            .unwrap();
        // Refreshes were queued while the mutation ran; this barrier waits for them.
        commands.submit_and_wait(|_| ()).await.unwrap();

        let view = snapshot.read();
        assert!(view.is_playing);
        assert_eq!(view.current_media_id(), Some("intro"));
        assert_eq!(view.next_media_id(), Some("verse"));

        let event = stream.recv().await.unwrap();
        assert!(matches!(
            event,
            ServiceEvent::Playback(PlaybackEvent::NowPlayingChanged { .. })
        ));

        owner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_removes_listener_and_releases() {
        let owner = owner_with(Arc::new(StateSnapshot::new()), EventBus::new(8)).await;
        let commands = owner.commands();

        assert!(owner.shutdown().await.unwrap());
        assert!(owner.is_shut_down());
        assert!(!owner.shutdown().await.unwrap());
        assert!(matches!(
            commands.submit(|engine| engine.play()),
            Err(PlaybackError::ExecutorShutDown)
        ));
    }

    #[tokio::test]
    async fn test_detached_listener_ignores_events() {
        let snapshot = Arc::new(StateSnapshot::new());
        let events = EventBus::new(8);
        let mut receiver = events.subscribe();
        let owner = owner_with(snapshot, events).await;

        owner.clear_listener();
        assert!(owner.is_listener_cleared());

        owner
            .listener
            .on_event(&EngineEvent::PlayerError {
                message: "late".to_string(),
            });
        assert!(matches!(
            receiver.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));

        owner.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_publishes_final_state() {
        let snapshot = Arc::new(StateSnapshot::new());
        let owner = owner_with(Arc::clone(&snapshot), EventBus::new(32)).await;
        let commands = owner.commands();

        commands
            .submit_and_wait(|engine| {
                engine.set_media_items(vec![MediaItemRef::new("a")], 0);
                engine.play();
            })
            .await
            .unwrap();
        commands.submit_and_wait(|_| ()).await.unwrap();
        assert!(snapshot.is_playing());

        // Runs after the queue closes, so its own refresh is rejected.
        commands
            .submit(|engine| {
                thread::sleep(Duration::from_millis(50));
                engine.pause();
            })
            .unwrap();
        owner.shutdown().await.unwrap();

        assert!(!snapshot.is_playing());
        assert_eq!(snapshot.read().current_media_id(), Some("a"));
    }
}
