//! Overlay driver
//!
//! Bridges the two independent activities: now-playing snapshots trigger
//! lyrics resolution in background tasks, while a fixed-cadence poll maps the
//! estimated playback position to the active line and pushes changes to the
//! display. Both run on one loop task, so timeline swaps are always observed
//! whole by the poller.

pub mod display;
pub mod events;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::OverlayConfig;
use crate::lrc::{Cursor, Line, Timeline};
use crate::lyrics::LyricsStore;
use crate::media::{NowPlaying, PlaybackState};
use display::Display;
use events::Event;

const RESOLVE_DEADLINE: Duration = Duration::from_secs(10);

pub struct App<D: Display> {
    store: LyricsStore,
    display: D,
    poll_interval: Duration,
    /// Queried position is biased forward to compensate for the display's
    /// own animation latency.
    display_bias: Duration,
    now_playing: Option<NowPlaying>,
    timeline: Option<Arc<Timeline>>,
    cursor: Cursor,
    current_line: Line,
}

impl<D: Display> App<D> {
    pub fn new(store: LyricsStore, display: D, cfg: &OverlayConfig) -> Self {
        Self {
            store,
            display,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms.max(1)),
            display_bias: Duration::from_millis(cfg.display_bias_ms),
            now_playing: None,
            timeline: None,
            cursor: Cursor::default(),
            current_line: Line::default(),
        }
    }

    /// Run until the snapshot stream closes.
    pub async fn run(mut self, mut updates: mpsc::Receiver<NowPlaying>) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(64);
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                maybe = updates.recv() => match maybe {
                    Some(snapshot) => self.on_media_update(snapshot, &tx),
                    None => break,
                },
                Some(ev) = rx.recv() => self.on_event(ev),
                _ = ticker.tick() => self.refresh_line(),
            }
        }
        Ok(())
    }

    /// Every snapshot re-triggers resolution; the store's cache and
    /// coalescing absorb bursty duplicate triggers.
    fn on_media_update(&mut self, snapshot: NowPlaying, tx: &mpsc::Sender<Event>) {
        self.now_playing = Some(snapshot.clone());
        let store = self.store.clone();
        let track = snapshot.track;
        let tx = tx.clone();
        tokio::spawn(async move {
            let event = match store.resolve(&track, RESOLVE_DEADLINE).await {
                Ok(timeline) => Event::LyricsLoaded { track, timeline },
                Err(err) => {
                    debug!("lyrics unavailable for {:?}: {err}", track.title);
                    Event::LyricsUnavailable { track }
                }
            };
            let _ = tx.send(event).await;
        });
    }

    fn on_event(&mut self, ev: Event) {
        match ev {
            Event::LyricsLoaded { track, timeline } => {
                // Ignore results for a track we've already moved past.
                if self.now_playing.as_ref().map(|np| &np.track) != Some(&track) {
                    return;
                }
                let unchanged = self
                    .timeline
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &timeline));
                if !unchanged {
                    self.timeline = Some(timeline);
                    self.cursor = Cursor::default();
                }
            }
            Event::LyricsUnavailable { track } => {
                if self.now_playing.as_ref().map(|np| &np.track) == Some(&track) {
                    self.timeline = None;
                }
            }
        }
        self.refresh_line();
    }

    /// One poll step: compute the active line and push it if it changed.
    fn refresh_line(&mut self) {
        let mut line = Line::default();
        if let (Some(np), Some(timeline)) = (&self.now_playing, &self.timeline)
            && np.state == PlaybackState::Playing
        {
            line = timeline.line_at(&mut self.cursor, np.position() + self.display_bias);
        }
        if line == self.current_line {
            return;
        }
        self.display.set_lyrics(&line.text);
        self.current_line = line;
    }
}
