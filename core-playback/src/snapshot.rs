//! # Now-Playing Snapshot
//!
//! Connecting a media controller can take a noticeable amount of time, so the
//! current playback info is published here for widgets and UI code that only
//! need a quick look.
//!
//! There is exactly one writer (the engine thread) and any number of readers.
//! Readers clone an `Arc` under a read lock held for a pointer copy, so they
//! never wait on engine work and never observe a half-written triple.

use bridge_traits::playback::MediaItemRef;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Immutable view of the now-playing state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    /// Playing, or buffering with intent to play.
    pub is_playing: bool,
    pub current_item: Option<MediaItemRef>,
    pub next_item: Option<MediaItemRef>,
}

impl PlaybackSnapshot {
    pub fn current_media_id(&self) -> Option<&str> {
        self.current_item.as_ref().map(|item| item.media_id.as_str())
    }

    pub fn next_media_id(&self) -> Option<&str> {
        self.next_item.as_ref().map(|item| item.media_id.as_str())
    }
}

/// Single-writer, multi-reader holder of the latest [`PlaybackSnapshot`].
#[derive(Debug, Default)]
pub struct StateSnapshot {
    inner: RwLock<Arc<PlaybackSnapshot>>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance used by the playback service.
    pub fn shared() -> Arc<StateSnapshot> {
        static SHARED: OnceLock<Arc<StateSnapshot>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(StateSnapshot::new())))
    }

    /// Latest fully written snapshot.
    pub fn read(&self) -> Arc<PlaybackSnapshot> {
        self.inner.read().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.read().is_playing
    }

    pub fn current_item(&self) -> Option<MediaItemRef> {
        self.read().current_item.clone()
    }

    pub fn next_item(&self) -> Option<MediaItemRef> {
        self.read().next_item.clone()
    }

    /// Replace the snapshot. Returns `false` when nothing changed.
    pub(crate) fn update(
        &self,
        is_playing: bool,
        current_item: Option<MediaItemRef>,
        next_item: Option<MediaItemRef>,
    ) -> bool {
        let snapshot = PlaybackSnapshot {
            is_playing,
            current_item,
            next_item,
        };

        let mut guard = self.inner.write();
        if **guard == snapshot {
            return false;
        }
        *guard = Arc::new(snapshot);
        true
    }
}
