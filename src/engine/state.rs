//! Playback state and its lock-free publication.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Pipeline playback state.
///
/// `Uninitialized` doubles as the backend's null state: nothing allocated,
/// nothing flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PlaybackState {
    #[default]
    Uninitialized,
    Ready,
    Paused,
    Playing,
}

impl PlaybackState {
    /// Whether a stream is prerolled (position and duration are meaningful).
    pub fn is_prerolled(self) -> bool {
        matches!(self, PlaybackState::Paused | PlaybackState::Playing)
    }

    fn to_u8(self) -> u8 {
        match self {
            PlaybackState::Uninitialized => 0,
            PlaybackState::Ready => 1,
            PlaybackState::Paused => 2,
            PlaybackState::Playing => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PlaybackState::Ready,
            2 => PlaybackState::Paused,
            3 => PlaybackState::Playing,
            _ => PlaybackState::Uninitialized,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackState::Uninitialized => "uninitialized",
            PlaybackState::Ready => "ready",
            PlaybackState::Paused => "paused",
            PlaybackState::Playing => "playing",
        };
        f.write_str(s)
    }
}

/// Status written by the worker and sampled by any thread.
#[derive(Debug, Default)]
pub struct SharedStatus {
    state: AtomicU8,
    media_loaded: AtomicBool,
    built: AtomicBool,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn media_loaded(&self) -> bool {
        self.media_loaded.load(Ordering::Acquire)
    }

    /// Whether the skeleton build has run (possibly degraded).
    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    pub(crate) fn publish_state(&self, state: PlaybackState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub(crate) fn publish_media_loaded(&self, loaded: bool) {
        self.media_loaded.store(loaded, Ordering::Release);
    }

    pub(crate) fn publish_built(&self) {
        self.built.store(true, Ordering::Release);
    }
}
