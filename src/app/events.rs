use std::sync::Arc;

use crate::lrc::Timeline;
use crate::media::TrackIdentity;

/// Events reported back to the app loop by background resolution tasks.
#[derive(Debug, Clone)]
pub enum Event {
    LyricsLoaded {
        track: TrackIdentity,
        timeline: Arc<Timeline>,
    },
    LyricsUnavailable {
        track: TrackIdentity,
    },
}
