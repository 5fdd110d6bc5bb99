//! # Playback Error Types

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors raised by the engine confinement and session layers.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The platform factory could not build an engine.
    #[error("Failed to construct playback engine: {0}")]
    EngineConstruction(String),

    /// The command queue no longer accepts work.
    #[error("Playback executor has shut down")]
    ExecutorShutDown,

    /// A command was accepted but never produced a result (it panicked or
    /// the executor stopped first).
    #[error("Playback command was dropped before completing")]
    CommandDropped,

    /// The media session was released; the caller holds a stale handle.
    #[error("Media session has been released")]
    SessionReleased,

    /// The OS refused to start the executor thread.
    #[error("Failed to spawn playback thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The executor thread terminated abnormally.
    #[error("Playback thread panicked: {0}")]
    ThreadPanicked(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` when the error means the service is being torn down
    /// rather than that something failed.
    pub fn is_shutdown(&self) -> bool {
        matches!(
            self,
            PlaybackError::ExecutorShutDown | PlaybackError::SessionReleased
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
