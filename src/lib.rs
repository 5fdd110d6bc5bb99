//! Workspace placeholder crate.
//!
//! This crate exposes shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-playback`). Host applications can
//! depend on `playback-host-workspace` and enable the documented features
//! without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{ControllerInfo, PlaybackService, ServiceMode};

#[cfg(feature = "desktop-shims")]
pub use core_playback::{MediaSession, PlaybackSnapshot, StateSnapshot};
