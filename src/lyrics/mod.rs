//! Lyrics resolution
//!
//! [`LyricsStore`] turns a track identity into a shared [`Timeline`]:
//! concurrent callers asking for the same track are coalesced into one
//! lookup, and completed lookups land in a bounded LRU cache. Both a parsed
//! timeline and an authoritative "not found" are cached; transient transport
//! failures are not, so the next trigger retries.

pub mod cache;
pub mod remote;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::lrc::Timeline;
use crate::media::TrackIdentity;
use cache::{CacheEntry, LookupCache};
use remote::LyricsSource;

/// Failure modes of a lookup. The kinds drive caching: only `NotFound` is a
/// cacheable outcome. `Clone` because one coalesced outcome is delivered to
/// every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LyricsError {
    /// Title or artist missing; a remote query would be meaningless.
    #[error("track title or artist missing")]
    InvalidQuery,
    /// The source authoritatively has no lyrics for this track.
    #[error("lyrics not found")]
    NotFound,
    /// Network failure or unexpected status. Safe to retry later.
    #[error("lyrics request failed: {0}")]
    Transport(String),
    /// The response stream could not be read.
    #[error("malformed lyrics payload: {0}")]
    Parse(String),
    /// The caller's deadline expired while waiting.
    #[error("lyrics lookup timed out")]
    Cancelled,
}

type Outcome = Result<Arc<Timeline>, LyricsError>;

struct StoreInner {
    source: Arc<dyn LyricsSource>,
    cache: LookupCache,
    /// One entry per outstanding lookup; the receiver resolves to the shared
    /// outcome. Removed before the outcome is published, so a caller that
    /// arrives after completion starts a fresh group.
    inflight: Mutex<HashMap<TrackIdentity, watch::Receiver<Option<Outcome>>>>,
}

#[derive(Clone)]
pub struct LyricsStore {
    inner: Arc<StoreInner>,
}

impl LyricsStore {
    pub fn new(source: Arc<dyn LyricsSource>, cache_capacity: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                source,
                cache: LookupCache::new(cache_capacity),
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Resolve a track to its timeline, waiting at most `deadline`.
    ///
    /// The deadline bounds only this caller's wait: when it expires the
    /// underlying fetch is abandoned, not aborted, so other waiters in the
    /// same group (and the cache) still receive its result.
    pub async fn resolve(&self, track: &TrackIdentity, deadline: Duration) -> Outcome {
        if track.title.is_empty() || track.artist.is_empty() {
            return Err(LyricsError::InvalidQuery);
        }
        match tokio::time::timeout(deadline, self.resolve_shared(track)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(LyricsError::Cancelled),
        }
    }

    /// Join the in-flight lookup for `track`, starting one if none exists,
    /// and wait for its outcome.
    async fn resolve_shared(&self, track: &TrackIdentity) -> Outcome {
        let mut rx = {
            let mut inflight = self.inner.inflight.lock().unwrap();
            match inflight.get(track) {
                Some(rx) => rx.clone(),
                None => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(track.clone(), rx.clone());
                    let store = self.clone();
                    let key = track.clone();
                    tokio::spawn(async move {
                        let outcome = store.lookup(&key).await;
                        store.inner.inflight.lock().unwrap().remove(&key);
                        let _ = tx.send(Some(outcome));
                    });
                    rx
                }
            }
        };
        loop {
            let settled = rx.borrow_and_update().clone();
            if let Some(outcome) = settled {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(LyricsError::Transport("lookup task went away".into()));
            }
        }
    }

    /// The single lookup performed on behalf of a coalescing group.
    async fn lookup(&self, track: &TrackIdentity) -> Outcome {
        if let Some(entry) = self.inner.cache.get(track) {
            return match entry {
                CacheEntry::Resolved(timeline) => Ok(timeline),
                CacheEntry::NotFound => Err(LyricsError::NotFound),
            };
        }
        match self.inner.source.fetch(&track.title, &track.artist).await {
            Ok(Some(body)) => {
                let timeline = Arc::new(Timeline::parse(&body));
                self.inner
                    .cache
                    .put(track.clone(), CacheEntry::Resolved(Arc::clone(&timeline)));
                Ok(timeline)
            }
            Ok(None) => {
                self.inner.cache.put(track.clone(), CacheEntry::NotFound);
                Err(LyricsError::NotFound)
            }
            // Transient: leave the cache alone so the next trigger retries.
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSource {
        calls: AtomicUsize,
        responses: Mutex<VecDeque<Result<Option<String>, LyricsError>>>,
        delay: Option<Duration>,
    }

    impl MockSource {
        fn scripted(responses: Vec<Result<Option<String>, LyricsError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses.into()),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LyricsSource for MockSource {
        async fn fetch(&self, _title: &str, _artist: &str) -> Result<Option<String>, LyricsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LyricsError::NotFound))
        }
    }

    const SAMPLE: &str = "[00:12.50][00:45.00]Hello world\n[01:00.00]Goodbye\n";
    const DEADLINE: Duration = Duration::from_secs(5);

    fn track(title: &str) -> TrackIdentity {
        TrackIdentity {
            title: title.into(),
            artist: "Artist".into(),
            album: "Album".into(),
            store_id: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_title_or_artist_skips_network() {
        let source = Arc::new(MockSource::scripted(vec![]));
        let store = LyricsStore::new(source.clone(), 8);

        let mut no_title = track("x");
        no_title.title.clear();
        assert_eq!(
            store.resolve(&no_title, DEADLINE).await.unwrap_err(),
            LyricsError::InvalidQuery
        );

        let mut no_artist = track("x");
        no_artist.artist.clear();
        assert_eq!(
            store.resolve(&no_artist, DEADLINE).await.unwrap_err(),
            LyricsError::InvalidQuery
        );
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_fetch() {
        let source = Arc::new(
            MockSource::scripted(vec![Ok(Some(SAMPLE.into()))])
                .with_delay(Duration::from_millis(50)),
        );
        let store = LyricsStore::new(source.clone(), 8);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let key = track("shared");
            handles.push(tokio::spawn(
                async move { store.resolve(&key, DEADLINE).await },
            ));
        }

        let mut timelines = Vec::new();
        for handle in handles {
            timelines.push(handle.await.unwrap().unwrap());
        }
        // Every waiter observed the outcome of the single fetch.
        assert_eq!(source.calls(), 1);
        for timeline in &timelines {
            assert!(Arc::ptr_eq(timeline, &timelines[0]));
        }
        assert_eq!(timelines[0].lines().len(), 3);
    }

    #[tokio::test]
    async fn test_resolved_timelines_are_cached() {
        let source = Arc::new(MockSource::scripted(vec![Ok(Some(SAMPLE.into()))]));
        let store = LyricsStore::new(source.clone(), 8);

        let first = store.resolve(&track("hit"), DEADLINE).await.unwrap();
        let second = store.resolve(&track("hit"), DEADLINE).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let source = Arc::new(MockSource::scripted(vec![Ok(None)]));
        let store = LyricsStore::new(source.clone(), 8);

        let key = track("missing");
        assert_eq!(
            store.resolve(&key, DEADLINE).await.unwrap_err(),
            LyricsError::NotFound
        );
        assert_eq!(
            store.resolve(&key, DEADLINE).await.unwrap_err(),
            LyricsError::NotFound
        );
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_are_not_cached() {
        let source = Arc::new(MockSource::scripted(vec![
            Err(LyricsError::Transport("connection reset".into())),
            Ok(Some(SAMPLE.into())),
        ]));
        let store = LyricsStore::new(source.clone(), 8);

        let key = track("flaky");
        assert!(matches!(
            store.resolve(&key, DEADLINE).await.unwrap_err(),
            LyricsError::Transport(_)
        ));
        // The failure did not poison the cache; the retry fetches again.
        assert!(store.resolve(&key, DEADLINE).await.is_ok());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_deadline_abandons_wait_but_not_fetch() {
        let source = Arc::new(
            MockSource::scripted(vec![Ok(Some(SAMPLE.into()))])
                .with_delay(Duration::from_millis(100)),
        );
        let store = LyricsStore::new(source.clone(), 8);

        let key = track("slow");
        assert_eq!(
            store
                .resolve(&key, Duration::from_millis(10))
                .await
                .unwrap_err(),
            LyricsError::Cancelled
        );

        // The abandoned fetch keeps running and populates the cache.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.resolve(&key, DEADLINE).await.is_ok());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_completed_group_is_torn_down() {
        let source = Arc::new(MockSource::scripted(vec![
            Err(LyricsError::Transport("boom".into())),
            Err(LyricsError::Transport("boom again".into())),
        ]));
        let store = LyricsStore::new(source.clone(), 8);

        let key = track("ephemeral");
        let _ = store.resolve(&key, DEADLINE).await;
        let _ = store.resolve(&key, DEADLINE).await;
        // Sequential calls after completion each started a fresh group.
        assert_eq!(source.calls(), 2);
        assert!(store.inner.inflight.lock().unwrap().is_empty());
    }
}
