//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback host:
//! - Logging and tracing infrastructure
//! - Service configuration and bridge wiring
//! - Event bus for lifecycle and now-playing notifications
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback and service crates
//! depend on. It establishes the logging conventions, the fail-fast
//! configuration builder, and the event broadcasting mechanism used
//! throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
