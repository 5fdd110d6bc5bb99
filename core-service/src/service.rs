//! # Playback Service
//!
//! Host-facing lifecycle of the playback service.
//!
//! `on_create` picks the initialization branch from the permission state,
//! builds the engine and media session, then either reloads the catalog
//! (full mode) or schedules the placeholder notification (degraded mode).
//! `on_destroy` tears everything down in order and is safe to call more
//! than once.

use crate::error::Result;
use crate::fallback::DegradedNotificationPublisher;
use crate::permission::PermissionGate;

use bridge_traits::playback::{EngineOptions, PlaybackEngine};
use bridge_traits::storage::{SettingsStore, GAPLESS_PLAYBACK_KEY};
use core_playback::{MediaSession, SessionLifecycleManager, StateSnapshot};
use core_runtime::config::ServiceConfig;
use core_runtime::events::{EventBus, EventStream, LifecycleEvent, ServiceEvent, ServiceMode};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Identity of a controller asking for the media session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerInfo {
    pub package_name: String,
    pub uid: u32,
}

impl ControllerInfo {
    pub fn new(package_name: impl Into<String>, uid: u32) -> Self {
        Self {
            package_name: package_name.into(),
            uid,
        }
    }
}

/// One instance of the playback service, from `on_create` to `on_destroy`.
pub struct PlaybackService {
    config: ServiceConfig,
    gate: PermissionGate,
    sessions: SessionLifecycleManager,
    snapshot: Arc<StateSnapshot>,
    events: EventBus,
    mode: Mutex<ServiceMode>,
    fallback: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackService {
    /// Start the service against the process-wide [`StateSnapshot`].
    pub async fn on_create(config: ServiceConfig) -> Result<Self> {
        Self::create(config, StateSnapshot::shared(), None).await
    }

    /// Start the service with an explicit snapshot and event bus.
    ///
    /// Subscribe to `events` beforehand to observe the
    /// [`LifecycleEvent::Created`] event.
    pub async fn on_create_with(
        config: ServiceConfig,
        snapshot: Arc<StateSnapshot>,
        events: EventBus,
    ) -> Result<Self> {
        Self::create(config, snapshot, Some(events)).await
    }

    #[instrument(skip_all, fields(thread = %config.executor_thread_name))]
    async fn create(
        config: ServiceConfig,
        snapshot: Arc<StateSnapshot>,
        events: Option<EventBus>,
    ) -> Result<Self> {
        config.validate()?;
        let events = events.unwrap_or_else(|| EventBus::new(config.event_capacity));

        let gate = PermissionGate::new(
            Arc::clone(&config.permission_checker),
            config.required_permission,
        );
        let mode = gate.decide();
        let options = resolve_engine_options(&config).await;

        let sessions = SessionLifecycleManager::initialize(
            Arc::clone(&config.engine_factory),
            options,
            Arc::clone(&snapshot),
            events.clone(),
            &config.executor_thread_name,
            config.sleep_timer.clone(),
        )
        .await?;

        let fallback = match mode {
            ServiceMode::Full => {
                config.media_item_provider.reload();
                None
            }
            ServiceMode::Degraded => {
                warn!(
                    permission = gate.permission().as_str(),
                    "Media permission missing; starting degraded"
                );
                Some(DegradedNotificationPublisher::from_config(&config).publish_fallback())
            }
        };

        info!(%mode, "Playback service created");
        let _ = events.emit(ServiceEvent::Lifecycle(LifecycleEvent::Created { mode }));

        Ok(Self {
            config,
            gate,
            sessions,
            snapshot,
            events,
            mode: Mutex::new(mode),
            fallback: Mutex::new(fallback),
        })
    }

    /// The media session for a connecting controller.
    ///
    /// Every controller gets the same session, in either mode.
    pub fn on_get_session(&self, controller: &ControllerInfo) -> Result<Arc<MediaSession>> {
        debug!(
            package = %controller.package_name,
            uid = controller.uid,
            "Controller requested session"
        );
        Ok(self.sessions.get_session()?)
    }

    /// Release the session and engine, cancel a pending placeholder
    /// notification and announce [`LifecycleEvent::Destroyed`].
    ///
    /// Only the first call does any work. The snapshot keeps its last value.
    pub async fn on_destroy(&self) -> Result<()> {
        if let Some(handle) = self.fallback.lock().take() {
            handle.abort();
        }

        match self.sessions.teardown().await {
            Ok(true) => {
                info!("Playback service destroyed");
                self.emit_destroyed();
                Ok(())
            }
            Ok(false) => {
                debug!("Playback service already destroyed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Playback service destroyed with errors");
                self.emit_destroyed();
                Err(err.into())
            }
        }
    }

    /// Pause and stop the engine, as requested from the notification's
    /// close action. The host is expected to follow up with `on_destroy`.
    pub fn stop_playback(&self) -> Result<()> {
        info!("Stop requested");
        self.with_engine(|engine| {
            engine.pause();
            engine.stop();
        })
    }

    /// Queue `command` on the engine thread.
    pub fn with_engine<F>(&self, command: F) -> Result<()>
    where
        F: FnOnce(&mut dyn PlaybackEngine) + Send + 'static,
    {
        let commands = self.sessions.commands()?;
        Ok(commands.submit(command)?)
    }

    /// Run `query` on the engine thread and wait for its result.
    pub async fn query_engine<F, R>(&self, query: F) -> Result<R>
    where
        F: FnOnce(&mut dyn PlaybackEngine) -> R + Send + 'static,
        R: Send + 'static,
    {
        let commands = self.sessions.commands()?;
        Ok(commands.submit_and_wait(query).await?)
    }

    /// Re-run the permission check and upgrade a degraded service.
    ///
    /// On the first successful check the catalog is reloaded, a pending
    /// placeholder notification is cancelled and [`LifecycleEvent::Upgraded`]
    /// is emitted. A full or destroyed service is left as is.
    pub fn recheck_permission(&self) -> ServiceMode {
        let mut mode = self.mode.lock();
        if *mode == ServiceMode::Full || self.sessions.is_released() {
            return *mode;
        }
        if !self.gate.has_required_permission() {
            return *mode;
        }

        *mode = ServiceMode::Full;
        drop(mode);

        if let Some(handle) = self.fallback.lock().take() {
            handle.abort();
        }
        self.config.media_item_provider.reload();

        info!("Permission granted; playback service upgraded");
        let _ = self
            .events
            .emit(ServiceEvent::Lifecycle(LifecycleEvent::Upgraded));
        ServiceMode::Full
    }

    pub fn mode(&self) -> ServiceMode {
        *self.mode.lock()
    }

    pub fn is_destroyed(&self) -> bool {
        self.sessions.is_released()
    }

    pub fn snapshot(&self) -> &Arc<StateSnapshot> {
        &self.snapshot
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        self.events.stream()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn emit_destroyed(&self) {
        let _ = self
            .events
            .emit(ServiceEvent::Lifecycle(LifecycleEvent::Destroyed));
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        if let Some(handle) = self.fallback.get_mut().take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for PlaybackService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackService")
            .field("mode", &self.mode())
            .field("gate", &self.gate)
            .field("sessions", &self.sessions)
            .finish()
    }
}

/// Configured engine options with the stored gapless preference applied.
async fn resolve_engine_options(config: &ServiceConfig) -> EngineOptions {
    let mut options = config.engine_options;
    if let Some(store) = &config.settings_store {
        if let Some(gapless) = read_gapless(store.as_ref()).await {
            options.skip_silence = gapless;
        }
    }
    options
}

async fn read_gapless(store: &dyn SettingsStore) -> Option<bool> {
    match store.get_bool(GAPLESS_PLAYBACK_KEY).await {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "Failed to read gapless preference; using configured value");
            None
        }
    }
}
