//! Notifications and Foreground Promotion
//!
//! A media service that is started in the foreground must post an ongoing
//! notification quickly, otherwise the host OS treats it as a fatal
//! condition. These traits separate *what* the notification says (rendering
//! subsystem) from *how* the process gets promoted (host runtime).

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Displayable notification payload.
///
/// The coordinator never inspects the contents; it only forwards the value
/// from a [`NotificationFactory`] to a [`ForegroundHost`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Channel the notification is posted on.
    pub channel_id: String,
    /// Title line.
    pub title: String,
    /// Body text.
    pub text: String,
    /// Whether the user can swipe it away.
    pub ongoing: bool,
}

impl Notification {
    pub fn new(
        channel_id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            title: title.into(),
            text: text.into(),
            ongoing: true,
        }
    }

    pub fn with_ongoing(mut self, ongoing: bool) -> Self {
        self.ongoing = ongoing;
        self
    }
}

/// Builds notification content for the playback service.
pub trait NotificationFactory: Send + Sync {
    /// Placeholder shown while the media permission is missing.
    fn create_no_permission_notification(&self) -> Notification;
}

/// Foreground-service promotion trait
///
/// - **Android**: `Service.startForeground` / `stopForeground`
/// - **Desktop**: typically a tray entry or a no-op with logging
///
/// `start_foreground` may fail when the process state no longer allows
/// promotion (e.g. the app was backgrounded in the meantime).
pub trait ForegroundHost: Send + Sync {
    /// Promote the process to the foreground, showing `notification`.
    fn start_foreground(&self, notification_id: u32, notification: Notification) -> Result<()>;

    /// Leave the foreground state.
    fn stop_foreground(&self, remove_notification: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_builder() {
        let notification = Notification::new("playback", "Music", "Permission required")
            .with_ongoing(false);

        assert_eq!(notification.channel_id, "playback");
        assert_eq!(notification.title, "Music");
        assert!(!notification.ongoing);
    }
}
