//! # Media Session & Lifecycle
//!
//! The media session is the handle external controllers (notification,
//! lock screen, Bluetooth, companion apps) use to drive playback.
//! [`SessionLifecycleManager`] hands out that single session and owns the
//! ordered teardown of session, engine and executor thread.

use crate::engine_owner::PlaybackEngineOwner;
use crate::error::{PlaybackError, Result};
use crate::executor::CommandSender;
use crate::snapshot::{PlaybackSnapshot, StateSnapshot};

use bridge_traits::playback::{
    EngineOptions, MediaItemRef, PlaybackEngine, PlaybackEngineFactory,
};
use bridge_traits::sleep_timer::SleepTimer;
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Controller-facing playback session.
///
/// Transport calls are queued on the engine thread and return as soon as
/// they are accepted. After release every call fails with
/// [`PlaybackError::SessionReleased`].
pub struct MediaSession {
    id: Uuid,
    commands: CommandSender,
    snapshot: Arc<StateSnapshot>,
    released: AtomicBool,
}

impl MediaSession {
    fn new(commands: CommandSender, snapshot: Arc<StateSnapshot>) -> Self {
        Self {
            id: Uuid::new_v4(),
            commands,
            snapshot,
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn play(&self) -> Result<()> {
        self.dispatch("play", |engine| engine.play())
    }

    pub fn pause(&self) -> Result<()> {
        self.dispatch("pause", |engine| engine.pause())
    }

    pub fn stop(&self) -> Result<()> {
        self.dispatch("stop", |engine| engine.stop())
    }

    pub fn seek_to(&self, position: Duration) -> Result<()> {
        self.dispatch("seek_to", move |engine| engine.seek_to(position))
    }

    pub fn seek_to_next(&self) -> Result<()> {
        self.dispatch("seek_to_next", |engine| engine.seek_to_next())
    }

    pub fn seek_to_previous(&self) -> Result<()> {
        self.dispatch("seek_to_previous", |engine| engine.seek_to_previous())
    }

    /// Replace the queue and start at `start_index`.
    pub fn set_media_items(&self, items: Vec<MediaItemRef>, start_index: usize) -> Result<()> {
        self.dispatch("set_media_items", move |engine| {
            engine.set_media_items(items, start_index)
        })
    }

    /// Latest now-playing snapshot; never waits on the engine.
    pub fn now_playing(&self) -> Result<Arc<PlaybackSnapshot>> {
        self.ensure_active("now_playing")?;
        Ok(self.snapshot.read())
    }

    fn ensure_active(&self, action: &'static str) -> Result<()> {
        if self.is_released() {
            error!(session = %self.id, action, "Media session used after release");
            return Err(PlaybackError::SessionReleased);
        }
        Ok(())
    }

    fn dispatch<F>(&self, action: &'static str, command: F) -> Result<()>
    where
        F: FnOnce(&mut dyn PlaybackEngine) + Send + 'static,
    {
        self.ensure_active(action)?;
        debug!(session = %self.id, action, "Session command");
        self.commands.submit(command).map_err(|err| match err {
            // Teardown raced this call.
            PlaybackError::ExecutorShutDown => PlaybackError::SessionReleased,
            other => other,
        })
    }

    /// Returns `false` if the session was already released.
    fn release(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSession")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

enum SessionState {
    Active {
        session: Arc<MediaSession>,
        owner: PlaybackEngineOwner,
    },
    Released,
}

/// Creates the session/engine pair and tears it down exactly once.
pub struct SessionLifecycleManager {
    state: Mutex<SessionState>,
    sleep_timer: Option<Arc<dyn SleepTimer>>,
    torn_down: watch::Sender<bool>,
}

/// Marks teardown finished when dropped, including when the teardown future
/// is cancelled part way.
struct TeardownDone<'a>(&'a watch::Sender<bool>);

impl Drop for TeardownDone<'_> {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

impl SessionLifecycleManager {
    /// Build the engine and wrap it in a fresh session.
    pub async fn initialize(
        factory: Arc<dyn PlaybackEngineFactory>,
        options: EngineOptions,
        snapshot: Arc<StateSnapshot>,
        events: EventBus,
        thread_name: &str,
        sleep_timer: Option<Arc<dyn SleepTimer>>,
    ) -> Result<Self> {
        let owner =
            PlaybackEngineOwner::initialize(factory, options, snapshot, events, thread_name)
                .await?;
        Ok(Self::new(owner, sleep_timer))
    }

    pub fn new(owner: PlaybackEngineOwner, sleep_timer: Option<Arc<dyn SleepTimer>>) -> Self {
        let session = Arc::new(MediaSession::new(
            owner.commands(),
            Arc::clone(owner.snapshot()),
        ));
        info!(session = %session.id(), "Media session created");

        Self {
            state: Mutex::new(SessionState::Active { session, owner }),
            sleep_timer,
            torn_down: watch::channel(false).0,
        }
    }

    /// The live session. Every call returns the same instance.
    pub fn get_session(&self) -> Result<Arc<MediaSession>> {
        match &*self.state.lock() {
            SessionState::Active { session, .. } => Ok(Arc::clone(session)),
            SessionState::Released => Err(PlaybackError::SessionReleased),
        }
    }

    /// Sender for service-level engine commands.
    pub fn commands(&self) -> Result<CommandSender> {
        match &*self.state.lock() {
            SessionState::Active { owner, .. } => Ok(owner.commands()),
            SessionState::Released => Err(PlaybackError::SessionReleased),
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(&*self.state.lock(), SessionState::Released)
    }

    /// Release the session, then the engine (on its thread, after queued
    /// work), then stop the sleep timer and disarm the listener.
    ///
    /// Only the first call does anything; it returns `Ok(true)`. Later
    /// calls return `Ok(false)` once that teardown has finished.
    pub async fn teardown(&self) -> Result<bool> {
        let previous = std::mem::replace(&mut *self.state.lock(), SessionState::Released);
        let SessionState::Active { session, owner } = previous else {
            debug!("Teardown already performed; waiting for it to finish");
            let mut done = self.torn_down.subscribe();
            // The sender lives in `self`, so the wait cannot see a closed channel.
            let _ = done.wait_for(|finished| *finished).await;
            return Ok(false);
        };
        let _done = TeardownDone(&self.torn_down);

        if !session.release() {
            warn!(session = %session.id(), "Session was released before teardown");
        }
        info!(session = %session.id(), "Media session released");

        let shutdown = owner.shutdown().await;

        if let Some(timer) = &self.sleep_timer {
            timer.stop();
        }
        owner.clear_listener();

        shutdown.map(|_| true)
    }
}

impl fmt::Debug for SessionLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLifecycleManager")
            .field("released", &self.is_released())
            .field("has_sleep_timer", &self.sleep_timer.is_some())
            .finish()
    }
}
