//! Notification content and foreground promotion for desktop.

use bridge_traits::{
    error::Result,
    notification::{ForegroundHost, Notification, NotificationFactory},
};
use parking_lot::Mutex;
use tracing::info;

/// Channel used for playback notifications.
pub const PLAYBACK_CHANNEL_ID: &str = "playback";

/// Builds plain-text notifications.
#[derive(Debug, Clone)]
pub struct DesktopNotificationFactory {
    app_name: String,
}

impl DesktopNotificationFactory {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Default for DesktopNotificationFactory {
    fn default() -> Self {
        Self::new("Music Player")
    }
}

impl NotificationFactory for DesktopNotificationFactory {
    fn create_no_permission_notification(&self) -> Notification {
        Notification::new(
            PLAYBACK_CHANNEL_ID,
            self.app_name.clone(),
            "Grant access to your music folder to start playback",
        )
    }
}

/// Current promotion state of a [`LoggingForegroundHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForegroundState {
    Background,
    Foreground {
        notification_id: u32,
        notification: Notification,
    },
}

/// Foreground host that only records and logs promotion requests.
///
/// Desktop processes are never killed for lacking a foreground notification,
/// so promotion always succeeds.
#[derive(Debug)]
pub struct LoggingForegroundHost {
    state: Mutex<ForegroundState>,
}

impl LoggingForegroundHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ForegroundState::Background),
        }
    }

    pub fn current(&self) -> ForegroundState {
        self.state.lock().clone()
    }
}

impl Default for LoggingForegroundHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundHost for LoggingForegroundHost {
    fn start_foreground(&self, notification_id: u32, notification: Notification) -> Result<()> {
        info!(
            notification_id,
            title = %notification.title,
            text = %notification.text,
            "Entering foreground"
        );
        *self.state.lock() = ForegroundState::Foreground {
            notification_id,
            notification,
        };
        Ok(())
    }

    fn stop_foreground(&self, remove_notification: bool) -> Result<()> {
        info!(remove_notification, "Leaving foreground");
        *self.state.lock() = ForegroundState::Background;
        Ok(())
    }
}
