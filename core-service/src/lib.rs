//! Playback service façade.
//!
//! This crate wires host-provided bridge implementations (engine factory,
//! permission checker, notification and foreground hooks, catalog, settings)
//! into the playback core and drives the service lifecycle the host
//! platform calls into: create, controller connect, destroy.
//!
//! Desktop hosts typically enable the `desktop-shims` feature, which lets
//! [`ServiceConfig`](core_runtime::config::ServiceConfig) fall back to the
//! `bridge-desktop` implementations for any bridge left unset.

pub mod error;
pub mod fallback;
pub mod permission;
pub mod service;

pub use error::{CoreError, Result};
pub use fallback::DegradedNotificationPublisher;
pub use permission::PermissionGate;
pub use service::{ControllerInfo, PlaybackService};

pub use core_runtime::events::ServiceMode;
