//! Lifecycle tests for the playback service
//!
//! This test suite verifies:
//! - The permission check picks the initialization branch
//! - The degraded branch posts exactly one delayed placeholder notification
//! - Engine construction failures surface from `on_create`
//! - The stored gapless preference reaches the engine
//! - Upgrades and teardown happen at most once

use bridge_desktop::{HeadlessEngineFactory, JsonSettingsStore};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::notification::{ForegroundHost, Notification, NotificationFactory};
use bridge_traits::permission::{Permission, PermissionChecker};
use bridge_traits::playback::{EngineOptions, MediaItemRef, PlaybackEngine, PlaybackEngineFactory};
use bridge_traits::storage::{SettingsStore, GAPLESS_PLAYBACK_KEY};
use bridge_traits::MediaItemProvider;
use core_playback::{PlaybackError, StateSnapshot};
use core_runtime::config::{ServiceConfig, ServiceConfigBuilder};
use core_runtime::events::{EventBus, EventStream, LifecycleEvent, ServiceEvent};
use core_service::{ControllerInfo, CoreError, PlaybackService, ServiceMode};
use mockall::mock;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Mocks
// ============================================================================

mock! {
    Catalog {}

    impl MediaItemProvider for Catalog {
        fn reload(&self);
    }
}

mock! {
    Checker {}

    impl PermissionChecker for Checker {
        fn has_permission(&self, permission: Permission) -> bool;
    }
}

mock! {
    Factory {}

    impl NotificationFactory for Factory {
        fn create_no_permission_notification(&self) -> Notification;
    }
}

mock! {
    Host {}

    impl ForegroundHost for Host {
        fn start_foreground(&self, notification_id: u32, notification: Notification) -> BridgeResult<()>;
        fn stop_foreground(&self, remove_notification: bool) -> BridgeResult<()>;
    }
}

/// Engine factory that remembers the options it was asked to build with.
#[derive(Default)]
struct OptionsProbe {
    inner: HeadlessEngineFactory,
    seen: Mutex<Option<EngineOptions>>,
}

impl PlaybackEngineFactory for OptionsProbe {
    fn create(&self, options: &EngineOptions) -> BridgeResult<Box<dyn PlaybackEngine>> {
        *self.seen.lock() = Some(*options);
        self.inner.create(options)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn checker(granted: Arc<AtomicBool>) -> Arc<MockChecker> {
    let mut checker = MockChecker::new();
    checker
        .expect_has_permission()
        .returning(move |_| granted.load(Ordering::SeqCst));
    Arc::new(checker)
}

fn catalog(reloads: usize) -> Arc<MockCatalog> {
    let mut catalog = MockCatalog::new();
    catalog.expect_reload().times(reloads).return_const(());
    Arc::new(catalog)
}

fn counting_host(posted: Arc<AtomicUsize>) -> Arc<MockHost> {
    let mut host = MockHost::new();
    host.expect_start_foreground().returning(move |_, _| {
        posted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    host.expect_stop_foreground().returning(|_| Ok(()));
    Arc::new(host)
}

fn placeholder_factory() -> Arc<MockFactory> {
    let mut factory = MockFactory::new();
    factory
        .expect_create_no_permission_notification()
        .returning(|| Notification::new("playback", "Music Player", "Permission required"));
    Arc::new(factory)
}

fn builder(
    granted: Arc<AtomicBool>,
    reloads: usize,
    posted: Arc<AtomicUsize>,
) -> ServiceConfigBuilder {
    ServiceConfig::builder()
        .engine_factory(Arc::new(HeadlessEngineFactory::new()))
        .permission_checker(checker(granted))
        .media_item_provider(catalog(reloads))
        .notification_factory(placeholder_factory())
        .foreground_host(counting_host(posted))
        .fallback_delay(Duration::from_millis(100))
        .executor_thread_name("service-test")
}

async fn start(config: ServiceConfig) -> (PlaybackService, EventStream) {
    let events = EventBus::new(32);
    let stream = events
        .stream()
        .filter(|event| matches!(event, ServiceEvent::Lifecycle(_)));
    let service = PlaybackService::on_create_with(config, Arc::new(StateSnapshot::new()), events)
        .await
        .unwrap();
    (service, stream)
}

fn drain(stream: &mut EventStream) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        if let ServiceEvent::Lifecycle(event) = event {
            events.push(event);
        }
    }
    events
}

fn controller() -> ControllerInfo {
    ControllerInfo::new("com.example.remote", 10_123)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_granted_permission_reloads_catalog_without_fallback() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 1, Arc::clone(&posted))
        .build()
        .unwrap();

    let (service, mut stream) = start(config).await;
    assert_eq!(service.mode(), ServiceMode::Full);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(posted.load(Ordering::SeqCst), 0);
    assert_eq!(
        drain(&mut stream),
        vec![LifecycleEvent::Created {
            mode: ServiceMode::Full
        }]
    );

    service.on_destroy().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_denied_permission_posts_one_delayed_placeholder() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(false)), 0, Arc::clone(&posted))
        .build()
        .unwrap();

    let (service, mut stream) = start(config).await;
    assert_eq!(service.mode(), ServiceMode::Degraded);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(posted.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(posted.load(Ordering::SeqCst), 1);
    assert_eq!(
        drain(&mut stream),
        vec![LifecycleEvent::Created {
            mode: ServiceMode::Degraded
        }]
    );

    service.on_destroy().await.unwrap();
    assert_eq!(posted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_degraded_service_still_hands_out_session() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(false)), 0, posted)
        .build()
        .unwrap();
    let (service, _) = start(config).await;

    let first = service.on_get_session(&controller()).unwrap();
    let second = service
        .on_get_session(&ControllerInfo::new("com.example.watch", 10_456))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    first.play().unwrap();

    service.on_destroy().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_destroy_before_delay_cancels_placeholder() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(false)), 0, Arc::clone(&posted))
        .build()
        .unwrap();
    let (service, _) = start(config).await;

    service.on_destroy().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(posted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_engine_failure_fails_creation() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 0, posted)
        .engine_factory(Arc::new(HeadlessEngineFactory::failing("no audio device")))
        .build()
        .unwrap();

    let result =
        PlaybackService::on_create_with(config, Arc::new(StateSnapshot::new()), EventBus::new(8))
            .await;
    match result {
        Err(CoreError::Playback(PlaybackError::EngineConstruction(message))) => {
            assert!(message.contains("no audio device"))
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("creation should fail"),
    }
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let posted = Arc::new(AtomicUsize::new(0));
    let mut config = builder(Arc::new(AtomicBool::new(true)), 0, posted)
        .build()
        .unwrap();
    config.notification_id = 0;

    let result = PlaybackService::on_create(config).await;
    assert!(matches!(result, Err(CoreError::Runtime(_))));
}

#[tokio::test]
async fn test_zero_event_capacity_is_rejected() {
    let posted = Arc::new(AtomicUsize::new(0));
    let mut config = builder(Arc::new(AtomicBool::new(true)), 0, posted)
        .build()
        .unwrap();
    config.event_capacity = 0;

    let result = PlaybackService::on_create(config).await;
    assert!(matches!(result, Err(CoreError::Runtime(_))));
}

#[tokio::test]
async fn test_gapless_preference_reaches_engine() {
    let store = Arc::new(JsonSettingsStore::in_memory());
    store.set_bool(GAPLESS_PLAYBACK_KEY, true).await.unwrap();
    let probe = Arc::new(OptionsProbe::default());

    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 1, posted)
        .engine_factory(probe.clone())
        .settings_store(store)
        .skip_silence(false)
        .build()
        .unwrap();
    let (service, _) = start(config).await;

    let seen = (*probe.seen.lock()).expect("engine was built");
    assert!(seen.skip_silence);
    assert!(seen.handle_audio_focus);

    service.on_destroy().await.unwrap();
}

#[tokio::test]
async fn test_missing_preference_keeps_configured_options() {
    let probe = Arc::new(OptionsProbe::default());
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 1, posted)
        .engine_factory(probe.clone())
        .settings_store(Arc::new(JsonSettingsStore::in_memory()))
        .skip_silence(true)
        .build()
        .unwrap();
    let (service, _) = start(config).await;

    let seen = (*probe.seen.lock()).expect("engine was built");
    assert!(seen.skip_silence);

    service.on_destroy().await.unwrap();
}

#[tokio::test]
async fn test_recheck_upgrades_exactly_once() {
    let granted = Arc::new(AtomicBool::new(false));
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::clone(&granted), 1, posted).build().unwrap();
    let (service, mut stream) = start(config).await;

    assert_eq!(service.recheck_permission(), ServiceMode::Degraded);

    granted.store(true, Ordering::SeqCst);
    assert_eq!(service.recheck_permission(), ServiceMode::Full);
    assert_eq!(service.recheck_permission(), ServiceMode::Full);
    assert_eq!(service.mode(), ServiceMode::Full);

    assert_eq!(
        drain(&mut stream),
        vec![
            LifecycleEvent::Created {
                mode: ServiceMode::Degraded
            },
            LifecycleEvent::Upgraded,
        ]
    );

    service.on_destroy().await.unwrap();
}

#[tokio::test]
async fn test_destroy_is_idempotent() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 1, posted)
        .build()
        .unwrap();
    let (service, mut stream) = start(config).await;
    let session = service.on_get_session(&controller()).unwrap();

    service.on_destroy().await.unwrap();
    service.on_destroy().await.unwrap();
    assert!(service.is_destroyed());

    assert_eq!(
        drain(&mut stream),
        vec![
            LifecycleEvent::Created {
                mode: ServiceMode::Full
            },
            LifecycleEvent::Destroyed,
        ]
    );
    assert!(session.is_released());
    assert!(service
        .on_get_session(&controller())
        .unwrap_err()
        .is_released());
    assert!(service.stop_playback().unwrap_err().is_released());
}

#[tokio::test]
async fn test_stop_playback_pauses_and_stops() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 1, posted)
        .build()
        .unwrap();
    let (service, _) = start(config).await;

    let session = service.on_get_session(&controller()).unwrap();
    session
        .set_media_items(vec![MediaItemRef::new("a"), MediaItemRef::new("b")], 0)
        .unwrap();
    session.play().unwrap();
    assert!(service.query_engine(|engine| engine.is_playing()).await.unwrap());

    service.stop_playback().unwrap();
    let playing = service.query_engine(|engine| engine.is_playing()).await.unwrap();
    assert!(!playing);

    service.on_destroy().await.unwrap();
}

#[tokio::test]
async fn test_snapshot_survives_destroy() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 1, posted)
        .build()
        .unwrap();
    let (service, _) = start(config).await;

    service
        .with_engine(|engine| {
            engine.set_media_items(vec![MediaItemRef::new("outro")], 0);
            engine.play();
        })
        .unwrap();
    // Barrier for the refreshes queued by the listener.
    service.query_engine(|_| ()).await.unwrap();
    service.query_engine(|_| ()).await.unwrap();

    let snapshot = Arc::clone(service.snapshot());
    service.on_destroy().await.unwrap();

    let view = snapshot.read();
    assert!(view.is_playing);
    assert_eq!(view.current_media_id(), Some("outro"));
}

#[tokio::test]
async fn test_stop_before_destroy_reaches_snapshot() {
    let posted = Arc::new(AtomicUsize::new(0));
    let config = builder(Arc::new(AtomicBool::new(true)), 1, posted)
        .build()
        .unwrap();
    let (service, _) = start(config).await;

    service
        .with_engine(|engine| {
            engine.set_media_items(vec![MediaItemRef::new("a")], 0);
            engine.play();
        })
        .unwrap();
    service.query_engine(|_| ()).await.unwrap();
    service.query_engine(|_| ()).await.unwrap();
    let snapshot = Arc::clone(service.snapshot());
    assert!(snapshot.is_playing());

    service
        .with_engine(|_| std::thread::sleep(Duration::from_millis(50)))
        .unwrap();
    service.stop_playback().unwrap();
    service.on_destroy().await.unwrap();

    assert!(!snapshot.is_playing());
}
