//! Now-playing track state
//!
//! Acquiring playback metadata is host-specific and lives outside this crate;
//! whatever watches the OS feeds [`NowPlaying`] snapshots into the app over an
//! `mpsc` channel, one per playback-state change plus one on subscription.

use std::time::{Duration, Instant};

/// Identity of a track as reported by the host player.
///
/// Used verbatim as the lookup cache and coalescing key: no normalization, no
/// case folding. Two identities are equal iff all four fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackIdentity {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub store_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Paused,
    Playing,
}

/// One playback-state snapshot from the host.
#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub track: TrackIdentity,
    pub state: PlaybackState,
    /// Elapsed playback time at the moment the snapshot was taken.
    pub elapsed: Duration,
    pub updated_at: Instant,
}

impl NowPlaying {
    /// Estimated current playback position.
    ///
    /// Snapshots only arrive on state changes, so while playing the position
    /// free-runs from the last snapshot.
    pub fn position(&self) -> Duration {
        match self.state {
            PlaybackState::Paused => self.elapsed,
            PlaybackState::Playing => self.elapsed + self.updated_at.elapsed(),
        }
    }
}
