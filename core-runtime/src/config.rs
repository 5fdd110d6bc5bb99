//! # Service Configuration Module
//!
//! Provides configuration management for the playback host service.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `ServiceConfig` holding every bridge and setting the playback coordinator
//! needs. It enforces fail-fast validation so a misconfigured host learns
//! about a missing capability at build time, not when the first controller
//! connects.
//!
//! ## Required Dependencies
//!
//! - `MediaItemProvider` - Catalog reload trigger
//! - `PlaybackEngineFactory` - Platform engine construction
//! - `PermissionChecker` - Runtime permission queries
//! - `NotificationFactory` / `ForegroundHost` - Degraded-mode notification
//!
//! ## Optional Dependencies
//!
//! - `SleepTimer` - stopped during teardown when present
//! - `SettingsStore` - source of the gapless playback preference
//!
//! When the `desktop-shims` feature is enabled, desktop defaults from
//! `bridge-desktop` are injected for the engine factory, permission checker,
//! notification factory and foreground host if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ServiceConfig;
//! use std::sync::Arc;
//!
//! let config = ServiceConfig::builder()
//!     .media_item_provider(Arc::new(MyCatalog))
//!     .skip_silence(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    EngineOptions, ForegroundHost, MediaItemProvider, NotificationFactory, Permission,
    PermissionChecker, PlaybackEngineFactory, SettingsStore, SleepTimer,
};
use std::sync::Arc;
use std::time::Duration;

/// Delay before the degraded-mode notification is posted.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(100);

/// Upper bound for [`ServiceConfig::fallback_delay`]. Hosts typically kill a
/// foreground service that has not posted a notification within seconds.
pub const MAX_FALLBACK_DELAY: Duration = Duration::from_secs(10);

/// Identifier of the playback notification.
pub const DEFAULT_NOTIFICATION_ID: u32 = 42;

/// Name of the dedicated engine thread.
pub const DEFAULT_EXECUTOR_THREAD_NAME: &str = "playback-engine";

/// Default event bus capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Configuration for the playback host service.
///
/// Use [`ServiceConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Builds the playback engine (required)
    pub engine_factory: Arc<dyn PlaybackEngineFactory>,

    /// Answers runtime permission queries (required)
    pub permission_checker: Arc<dyn PermissionChecker>,

    /// Catalog subsystem (required)
    pub media_item_provider: Arc<dyn MediaItemProvider>,

    /// Renders the placeholder notification (required)
    pub notification_factory: Arc<dyn NotificationFactory>,

    /// Promotes the process to the foreground (required)
    pub foreground_host: Arc<dyn ForegroundHost>,

    /// Sleep timer stopped at teardown (optional)
    pub sleep_timer: Option<Arc<dyn SleepTimer>>,

    /// Preferences store (optional)
    pub settings_store: Option<Arc<dyn SettingsStore>>,

    /// Engine behaviour toggles
    pub engine_options: EngineOptions,

    /// Permission that gates catalog loading
    pub required_permission: Permission,

    /// Delay before the degraded notification is posted
    pub fallback_delay: Duration,

    /// Notification id used for foreground promotion
    pub notification_id: u32,

    /// Name given to the engine thread
    pub executor_thread_name: String,

    /// Event bus buffer size
    pub event_capacity: usize,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("engine_factory", &"PlaybackEngineFactory { ... }")
            .field("permission_checker", &"PermissionChecker { ... }")
            .field("media_item_provider", &"MediaItemProvider { ... }")
            .field("notification_factory", &"NotificationFactory { ... }")
            .field("foreground_host", &"ForegroundHost { ... }")
            .field(
                "sleep_timer",
                &self.sleep_timer.as_ref().map(|_| "SleepTimer { ... }"),
            )
            .field(
                "settings_store",
                &self.settings_store.as_ref().map(|_| "SettingsStore { ... }"),
            )
            .field("engine_options", &self.engine_options)
            .field("required_permission", &self.required_permission)
            .field("fallback_delay", &self.fallback_delay)
            .field("notification_id", &self.notification_id)
            .field("executor_thread_name", &self.executor_thread_name)
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

impl ServiceConfig {
    /// Creates a new builder for constructing a `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Validates the configuration values.
    ///
    /// This checks:
    /// - Fallback delay is within `1ms..=10s`
    /// - Notification id is non-zero (zero is rejected by foreground promotion)
    /// - Executor thread name is not empty
    /// - Event capacity is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.fallback_delay.is_zero() {
            return Err(Error::InvalidValue {
                field: "fallback_delay",
                message: "must be greater than zero to let foreground promotion settle"
                    .to_string(),
            });
        }

        if self.fallback_delay > MAX_FALLBACK_DELAY {
            return Err(Error::InvalidValue {
                field: "fallback_delay",
                message: format!("exceeds maximum of {:?}", MAX_FALLBACK_DELAY),
            });
        }

        if self.notification_id == 0 {
            return Err(Error::InvalidValue {
                field: "notification_id",
                message: "foreground notifications require a non-zero id".to_string(),
            });
        }

        if self.executor_thread_name.trim().is_empty() {
            return Err(Error::InvalidValue {
                field: "executor_thread_name",
                message: "cannot be empty".to_string(),
            });
        }

        if self.event_capacity == 0 {
            return Err(Error::InvalidValue {
                field: "event_capacity",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn media_item_provider_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaItemProvider".to_string(),
        message: "MediaItemProvider implementation is required to load the media catalog. \
                 Inject the host catalog subsystem with .media_item_provider()."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing_error(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the bridge-desktop default. \
             Mobile: inject the platform-native adapter.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_engine_factory() -> Result<Arc<dyn PlaybackEngineFactory>> {
    Ok(Arc::new(bridge_desktop::HeadlessEngineFactory::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_engine_factory() -> Result<Arc<dyn PlaybackEngineFactory>> {
    Err(capability_missing_error(
        "PlaybackEngineFactory",
        "audio playback",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_permission_checker() -> Result<Arc<dyn PermissionChecker>> {
    let checker = bridge_desktop::DirectoryPermissionChecker::for_audio_dir().ok_or_else(|| {
        Error::CapabilityMissing {
            capability: "PermissionChecker".to_string(),
            message: "No audio directory could be resolved for the current user. \
                     Inject a PermissionChecker explicitly."
                .to_string(),
        }
    })?;
    Ok(Arc::new(checker))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_permission_checker() -> Result<Arc<dyn PermissionChecker>> {
    Err(capability_missing_error(
        "PermissionChecker",
        "gating catalog access on the media permission",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_notification_factory() -> Result<Arc<dyn NotificationFactory>> {
    Ok(Arc::new(bridge_desktop::DesktopNotificationFactory::default()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_notification_factory() -> Result<Arc<dyn NotificationFactory>> {
    Err(capability_missing_error(
        "NotificationFactory",
        "the no-permission notification",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_foreground_host() -> Result<Arc<dyn ForegroundHost>> {
    Ok(Arc::new(bridge_desktop::LoggingForegroundHost::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_foreground_host() -> Result<Arc<dyn ForegroundHost>> {
    Err(capability_missing_error(
        "ForegroundHost",
        "foreground-service promotion",
    ))
}

/// Builder for constructing [`ServiceConfig`] instances.
///
/// Call [`build()`](ServiceConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct ServiceConfigBuilder {
    engine_factory: Option<Arc<dyn PlaybackEngineFactory>>,
    permission_checker: Option<Arc<dyn PermissionChecker>>,
    media_item_provider: Option<Arc<dyn MediaItemProvider>>,
    notification_factory: Option<Arc<dyn NotificationFactory>>,
    foreground_host: Option<Arc<dyn ForegroundHost>>,
    sleep_timer: Option<Arc<dyn SleepTimer>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    engine_options: Option<EngineOptions>,
    required_permission: Option<Permission>,
    fallback_delay: Option<Duration>,
    notification_id: Option<u32>,
    executor_thread_name: Option<String>,
    event_capacity: Option<usize>,
}

impl ServiceConfigBuilder {
    /// Sets the engine factory.
    ///
    /// If not provided, the headless desktop engine is used when the
    /// `desktop-shims` feature is enabled.
    pub fn engine_factory(mut self, factory: Arc<dyn PlaybackEngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Sets the permission checker.
    pub fn permission_checker(mut self, checker: Arc<dyn PermissionChecker>) -> Self {
        self.permission_checker = Some(checker);
        self
    }

    /// Sets the catalog subsystem (required).
    pub fn media_item_provider(mut self, provider: Arc<dyn MediaItemProvider>) -> Self {
        self.media_item_provider = Some(provider);
        self
    }

    /// Sets the notification factory.
    pub fn notification_factory(mut self, factory: Arc<dyn NotificationFactory>) -> Self {
        self.notification_factory = Some(factory);
        self
    }

    /// Sets the foreground host.
    pub fn foreground_host(mut self, host: Arc<dyn ForegroundHost>) -> Self {
        self.foreground_host = Some(host);
        self
    }

    /// Sets the sleep timer (optional).
    pub fn sleep_timer(mut self, timer: Arc<dyn SleepTimer>) -> Self {
        self.sleep_timer = Some(timer);
        self
    }

    /// Sets the settings store (optional).
    ///
    /// When present, the `gapless_playback` preference overrides
    /// [`EngineOptions::skip_silence`] at startup.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets all engine options at once.
    ///
    /// Default: audio focus and noisy handling on, silence skipping off.
    pub fn engine_options(mut self, options: EngineOptions) -> Self {
        self.engine_options = Some(options);
        self
    }

    /// Enables or disables silence skipping.
    pub fn skip_silence(mut self, enabled: bool) -> Self {
        let mut options = self.engine_options.unwrap_or_default();
        options.skip_silence = enabled;
        self.engine_options = Some(options);
        self
    }

    /// Sets the permission that gates catalog loading.
    ///
    /// Default: [`Permission::ReadMediaAudio`]. Use
    /// [`platform_api_level`](Self::platform_api_level) to derive it instead.
    pub fn required_permission(mut self, permission: Permission) -> Self {
        self.required_permission = Some(permission);
        self
    }

    /// Derives the required permission from the platform API level.
    pub fn platform_api_level(mut self, api_level: u32) -> Self {
        self.required_permission = Some(Permission::for_media_access(api_level));
        self
    }

    /// Sets the degraded notification delay.
    ///
    /// Default: 100ms
    pub fn fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = Some(delay);
        self
    }

    /// Sets the foreground notification id.
    ///
    /// Default: 42
    pub fn notification_id(mut self, id: u32) -> Self {
        self.notification_id = Some(id);
        self
    }

    /// Sets the engine thread name.
    ///
    /// Default: `playback-engine`
    pub fn executor_thread_name(mut self, name: impl Into<String>) -> Self {
        self.executor_thread_name = Some(name.into());
        self
    }

    /// Sets the event bus capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Builds the final `ServiceConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns an error if:
    /// - Required bridges are missing and no desktop default applies
    /// - Configuration values are invalid
    pub fn build(self) -> Result<ServiceConfig> {
        let media_item_provider = self
            .media_item_provider
            .ok_or_else(media_item_provider_missing_error)?;

        let engine_factory = match self.engine_factory {
            Some(factory) => factory,
            None => provide_default_engine_factory()?,
        };

        let permission_checker = match self.permission_checker {
            Some(checker) => checker,
            None => provide_default_permission_checker()?,
        };

        let notification_factory = match self.notification_factory {
            Some(factory) => factory,
            None => provide_default_notification_factory()?,
        };

        let foreground_host = match self.foreground_host {
            Some(host) => host,
            None => provide_default_foreground_host()?,
        };

        let config = ServiceConfig {
            engine_factory,
            permission_checker,
            media_item_provider,
            notification_factory,
            foreground_host,
            sleep_timer: self.sleep_timer,
            settings_store: self.settings_store,
            engine_options: self.engine_options.unwrap_or_default(),
            required_permission: self
                .required_permission
                .unwrap_or(Permission::ReadMediaAudio),
            fallback_delay: self.fallback_delay.unwrap_or(DEFAULT_FALLBACK_DELAY),
            notification_id: self.notification_id.unwrap_or(DEFAULT_NOTIFICATION_ID),
            executor_thread_name: self
                .executor_thread_name
                .unwrap_or_else(|| DEFAULT_EXECUTOR_THREAD_NAME.to_string()),
            event_capacity: self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, Notification, PlaybackEngine};

    struct NoopCatalog;

    impl MediaItemProvider for NoopCatalog {
        fn reload(&self) {}
    }

    struct RejectingFactory;

    impl PlaybackEngineFactory for RejectingFactory {
        fn create(&self, _options: &EngineOptions) -> BridgeResult<Box<dyn PlaybackEngine>> {
            Err(BridgeError::NotAvailable("no output device".to_string()))
        }
    }

    struct AlwaysGranted;

    impl PermissionChecker for AlwaysGranted {
        fn has_permission(&self, _permission: Permission) -> bool {
            true
        }
    }

    struct PlainNotifications;

    impl NotificationFactory for PlainNotifications {
        fn create_no_permission_notification(&self) -> Notification {
            Notification::new("playback", "Music", "Permission required")
        }
    }

    struct NoopHost;

    impl ForegroundHost for NoopHost {
        fn start_foreground(&self, _id: u32, _notification: Notification) -> BridgeResult<()> {
            Ok(())
        }

        fn stop_foreground(&self, _remove: bool) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn full_builder() -> ServiceConfigBuilder {
        ServiceConfig::builder()
            .media_item_provider(Arc::new(NoopCatalog))
            .engine_factory(Arc::new(RejectingFactory))
            .permission_checker(Arc::new(AlwaysGranted))
            .notification_factory(Arc::new(PlainNotifications))
            .foreground_host(Arc::new(NoopHost))
    }

    #[test]
    fn test_build_with_all_bridges() {
        let config = full_builder().build().expect("config should build");

        assert_eq!(config.fallback_delay, DEFAULT_FALLBACK_DELAY);
        assert_eq!(config.notification_id, DEFAULT_NOTIFICATION_ID);
        assert_eq!(config.executor_thread_name, DEFAULT_EXECUTOR_THREAD_NAME);
        assert_eq!(config.required_permission, Permission::ReadMediaAudio);
        assert_eq!(config.engine_options, EngineOptions::default());
        assert!(config.sleep_timer.is_none());
    }

    #[test]
    fn test_builder_requires_media_item_provider() {
        let result = ServiceConfig::builder()
            .engine_factory(Arc::new(RejectingFactory))
            .permission_checker(Arc::new(AlwaysGranted))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("MediaItemProvider"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_engine_factory_without_desktop_shims() {
        let result = ServiceConfig::builder()
            .media_item_provider(Arc::new(NoopCatalog))
            .permission_checker(Arc::new(AlwaysGranted))
            .notification_factory(Arc::new(PlainNotifications))
            .foreground_host(Arc::new(NoopHost))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("PlaybackEngineFactory"));
        assert!(err_msg.contains("desktop-shims"));
    }

    #[test]
    fn test_skip_silence_keeps_other_engine_options() {
        let config = full_builder().skip_silence(true).build().unwrap();

        assert!(config.engine_options.skip_silence);
        assert!(config.engine_options.handle_audio_focus);
        assert!(config.engine_options.handle_audio_becoming_noisy);
    }

    #[test]
    fn test_platform_api_level_selects_permission() {
        let config = full_builder().platform_api_level(30).build().unwrap();
        assert_eq!(config.required_permission, Permission::ReadExternalStorage);
    }

    #[test]
    fn test_validate_rejects_zero_fallback_delay() {
        let result = full_builder().fallback_delay(Duration::ZERO).build();
        assert!(result.unwrap_err().to_string().contains("fallback_delay"));
    }

    #[test]
    fn test_validate_rejects_long_fallback_delay() {
        let result = full_builder()
            .fallback_delay(Duration::from_secs(30))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_notification_id() {
        let result = full_builder().notification_id(0).build();
        assert!(result.unwrap_err().to_string().contains("notification_id"));
    }

    #[test]
    fn test_validate_rejects_blank_thread_name() {
        let result = full_builder().executor_thread_name("   ").build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("executor_thread_name"));
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = full_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("PlaybackEngineFactory { ... }"));
        assert!(debug.contains("notification_id: 42"));
    }
}
