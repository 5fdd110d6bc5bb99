use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl CoreError {
    /// Returns `true` when the caller used the service after `on_destroy`.
    pub fn is_released(&self) -> bool {
        matches!(
            self,
            CoreError::Playback(core_playback::PlaybackError::SessionReleased)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
