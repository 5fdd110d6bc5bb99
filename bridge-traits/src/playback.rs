//! Playback engine bridge traits and supporting types.
//!
//! These abstractions let the coordinator drive a platform-specific audio
//! engine (ExoPlayer, AVPlayer, a desktop mixer) without knowing anything
//! about decoding or output. The engine is built by a
//! [`PlaybackEngineFactory`] *on* the coordinator's command thread and never
//! leaves it, which is why [`PlaybackEngine`] has no `Send`/`Sync` bound and
//! its methods take `&mut self` synchronously.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Reference to a catalog item the engine can play.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaItemRef {
    /// Stable catalog identifier.
    pub media_id: String,
    /// Display title.
    pub title: Option<String>,
    /// Display artist.
    pub artist: Option<String>,
    /// Album or collection name.
    pub album: Option<String>,
    /// Playable location (file path or URI), when known.
    pub uri: Option<String>,
}

impl MediaItemRef {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            title: None,
            artist: None,
            album: None,
            uri: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

/// Platform-level behaviours toggled at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Request and react to audio focus (duck/pause when another app plays).
    pub handle_audio_focus: bool,
    /// Pause when the output route becomes noisy (headphones unplugged).
    pub handle_audio_becoming_noisy: bool,
    /// Skip silent passages (used for gapless playback).
    pub skip_silence: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            handle_audio_focus: true,
            handle_audio_becoming_noisy: true,
            skip_silence: false,
        }
    }
}

/// Transport state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No media loaded or engine stopped.
    Idle,
    /// Waiting for data before playback can continue.
    Buffering,
    /// Able to play immediately.
    Ready,
    /// Reached the end of the queue.
    Ended,
}

/// Events delivered to registered [`EngineListener`]s.
///
/// Engines may deliver these from any thread, including their own internal
/// ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The current item changed (track transition, seek to another item,
    /// queue replaced).
    MediaItemTransition { item: Option<MediaItemRef> },
    /// Transport state changed.
    PlaybackStateChanged(PlaybackState),
    /// Effective playing flag changed.
    IsPlayingChanged(bool),
    /// The engine hit a playback error.
    PlayerError { message: String },
}

impl EngineEvent {
    /// Whether this event can change what the now-playing snapshot reports.
    pub fn affects_now_playing(&self) -> bool {
        matches!(
            self,
            EngineEvent::MediaItemTransition { .. }
                | EngineEvent::PlaybackStateChanged(_)
                | EngineEvent::IsPlayingChanged(_)
        )
    }
}

/// Subscription handle returned by [`PlaybackEngine::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receiver of engine events.
pub trait EngineListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

/// Platform playback engine.
///
/// Every method is called from the coordinator's command thread only.
pub trait PlaybackEngine {
    /// Register a listener. The engine keeps it until
    /// [`remove_listener`](PlaybackEngine::remove_listener) is called.
    fn add_listener(&mut self, listener: Arc<dyn EngineListener>) -> ListenerId;

    /// Unregister a listener. Returns `false` for unknown ids.
    fn remove_listener(&mut self, id: ListenerId) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    /// Stop playback, keeping the queue.
    fn stop(&mut self);

    /// Seek within the current item.
    fn seek_to(&mut self, position: Duration);

    fn seek_to_next(&mut self);

    fn seek_to_previous(&mut self);

    /// Replace the queue and move to `start_index`.
    fn set_media_items(&mut self, items: Vec<MediaItemRef>, start_index: usize);

    fn current_media_item(&self) -> Option<MediaItemRef>;

    fn next_media_item(&self) -> Option<MediaItemRef>;

    fn is_playing(&self) -> bool;

    fn playback_state(&self) -> PlaybackState;

    /// Whether playback proceeds as soon as the engine is ready.
    fn play_when_ready(&self) -> bool;

    /// Playing, or about to play once buffering completes.
    fn is_playing_or_buffering(&self) -> bool {
        self.is_playing()
            || (self.playback_state() == PlaybackState::Buffering && self.play_when_ready())
    }

    /// Release native resources. The engine must not be used afterwards.
    fn release(&mut self);
}

/// Builds the platform engine.
///
/// Called exactly once per service instance, on the command thread.
/// Returns an error when the platform rejects the configuration (unsupported
/// audio setup, no output device).
pub trait PlaybackEngineFactory: Send + Sync {
    fn create(&self, options: &EngineOptions) -> Result<Box<dyn PlaybackEngine>>;
}
