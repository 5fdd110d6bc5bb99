//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback coordinator and the
//! platform it runs on. Each trait represents a capability the core requires
//! but that must be implemented differently per platform (desktop, Android,
//! iOS).
//!
//! ## Traits
//!
//! ### Playback
//! - [`PlaybackEngineFactory`](playback::PlaybackEngineFactory) - Builds the platform audio engine
//! - [`PlaybackEngine`](playback::PlaybackEngine) - Transport control and state queries
//! - [`EngineListener`](playback::EngineListener) - Engine event callbacks
//!
//! ### Platform Integration
//! - [`PermissionChecker`](permission::PermissionChecker) - Runtime permission queries
//! - [`ForegroundHost`](notification::ForegroundHost) - Foreground-service promotion
//! - [`NotificationFactory`](notification::NotificationFactory) - Placeholder notification content
//! - [`MediaItemProvider`](catalog::MediaItemProvider) - Media catalog reload trigger
//! - [`SleepTimer`](sleep_timer::SleepTimer) - Sleep timer countdown
//!
//! ### Storage & Utilities
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | Android  | TBD                 | 📋 Planned |
//! | iOS      | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All fallible bridge calls use [`BridgeError`](error::BridgeError).
//! Platform implementations should convert platform-specific failures into
//! `BridgeError` with actionable messages.
//!
//! ## Thread Safety
//!
//! Every bridge except [`PlaybackEngine`](playback::PlaybackEngine) requires
//! `Send + Sync`. The engine is created on, and confined to, the coordinator's
//! dedicated command thread, so it carries no thread-safety bounds of its own.

pub mod catalog;
pub mod error;
pub mod logging;
pub mod notification;
pub mod permission;
pub mod playback;
pub mod sleep_timer;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::MediaItemProvider;
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use notification::{ForegroundHost, Notification, NotificationFactory};
pub use permission::{Permission, PermissionChecker};
pub use playback::{
    EngineEvent, EngineListener, EngineOptions, ListenerId, MediaItemRef, PlaybackEngine,
    PlaybackEngineFactory, PlaybackState,
};
pub use sleep_timer::SleepTimer;
pub use storage::SettingsStore;
