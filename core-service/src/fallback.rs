//! Delayed foreground notification for the degraded path.
//!
//! Without the media permission the service never loads the catalog, so
//! nothing else would post a notification. The host still expects a
//! foreground service to show one shortly after start, so this publishes a
//! placeholder after a short delay.

use bridge_traits::notification::{ForegroundHost, NotificationFactory};
use core_runtime::config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Posts the "permission required" notification once, after a delay.
#[derive(Clone)]
pub struct DegradedNotificationPublisher {
    factory: Arc<dyn NotificationFactory>,
    host: Arc<dyn ForegroundHost>,
    notification_id: u32,
    delay: Duration,
}

impl DegradedNotificationPublisher {
    pub fn new(
        factory: Arc<dyn NotificationFactory>,
        host: Arc<dyn ForegroundHost>,
        notification_id: u32,
        delay: Duration,
    ) -> Self {
        Self {
            factory,
            host,
            notification_id,
            delay,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            Arc::clone(&config.notification_factory),
            Arc::clone(&config.foreground_host),
            config.notification_id,
            config.fallback_delay,
        )
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule the placeholder notification and return immediately.
    ///
    /// A failed foreground promotion is logged and swallowed. Aborting the
    /// returned handle before the delay elapses cancels the publication.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn publish_fallback(&self) -> JoinHandle<()> {
        let publisher = self.clone();
        debug!(delay_ms = self.delay.as_millis() as u64, "Scheduling placeholder notification");

        tokio::spawn(async move {
            tokio::time::sleep(publisher.delay).await;
            publisher.publish_now();
        })
    }

    fn publish_now(&self) {
        let notification = self.factory.create_no_permission_notification();
        match self.host.start_foreground(self.notification_id, notification) {
            Ok(()) => info!(
                notification_id = self.notification_id,
                "Placeholder notification posted"
            ),
            Err(err) => debug!(error = %err, "Foreground promotion failed; ignoring"),
        }
    }
}

impl std::fmt::Debug for DegradedNotificationPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradedNotificationPublisher")
            .field("notification_id", &self.notification_id)
            .field("delay", &self.delay)
            .finish()
    }
}
