//! # Desktop Bridge Implementations
//!
//! Default implementations of the playback host bridge traits for desktop
//! platforms (macOS, Windows, Linux) and for tests.
//!
//! ## Overview
//!
//! - `PlaybackEngineFactory` → [`HeadlessEngineFactory`], a queue/transport
//!   state machine without audio output
//! - `PermissionChecker` → [`DirectoryPermissionChecker`], probing the user's
//!   audio directory
//! - `NotificationFactory` → [`DesktopNotificationFactory`]
//! - `ForegroundHost` → [`LoggingForegroundHost`], which records promotion
//!   state and logs it
//! - `SleepTimer` → [`TokioSleepTimer`] using a cancellation token
//! - `SettingsStore` → [`JsonSettingsStore`], a JSON file under the config dir
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HeadlessEngineFactory, JsonSettingsStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let factory = HeadlessEngineFactory::new();
//!     let settings = JsonSettingsStore::open_default().await.unwrap();
//!
//!     // Use in service configuration
//! }
//! ```

mod engine;
mod notification;
mod permission;
mod settings;
mod sleep_timer;

pub use engine::{HeadlessEngineFactory, HeadlessPlaybackEngine};
pub use notification::{DesktopNotificationFactory, ForegroundState, LoggingForegroundHost};
pub use permission::DirectoryPermissionChecker;
pub use settings::JsonSettingsStore;
pub use sleep_timer::TokioSleepTimer;
