//! # Playback Engine Confinement & Session Lifecycle
//!
//! Owns the platform playback engine on a dedicated thread and exposes it to
//! the rest of the process through a media session and a lock-light
//! now-playing snapshot.
//!
//! ## Overview
//!
//! - [`executor`]: single-thread FIFO command queue; the only path that
//!   touches the engine
//! - [`engine_owner`]: builds the engine on that thread and keeps the
//!   snapshot in sync with engine events
//! - [`session`]: the controller-facing media session and its ordered
//!   teardown
//! - [`snapshot`]: now-playing state readable from any thread
//!
//! ## Thread model
//!
//! ```text
//!  controllers / host (tokio)          playback-engine thread
//!  ──────────────────────────          ──────────────────────
//!  MediaSession::play() ──submit──►  [cmd][cmd][cmd] ──► engine
//!                                                          │ events
//!  StateSnapshot::read() ◄──update── SnapshotListener ◄────┘
//! ```

pub mod engine_owner;
pub mod error;
pub mod executor;
pub mod session;
pub mod snapshot;

pub use engine_owner::PlaybackEngineOwner;
pub use error::{PlaybackError, Result};
pub use executor::{CommandExecutor, CommandSender};
pub use session::{MediaSession, SessionLifecycleManager};
pub use snapshot::{PlaybackSnapshot, StateSnapshot};
