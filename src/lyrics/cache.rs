//! Bounded lookup cache
//!
//! Maps a track identity to the outcome of a completed lookup. Both presence
//! and authoritative absence are cached; transient failures never land here.
//! Entries have no TTL and are only dropped under capacity pressure.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::lrc::Timeline;
use crate::media::TrackIdentity;

pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub enum CacheEntry {
    Resolved(Arc<Timeline>),
    NotFound,
}

#[derive(Debug)]
pub struct LookupCache {
    inner: Mutex<LruCache<TrackIdentity, CacheEntry>>,
}

impl LookupCache {
    /// Create a cache holding up to `capacity` entries (zero falls back to
    /// the default).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up an entry; a hit counts as a use for eviction purposes.
    pub fn get(&self, track: &TrackIdentity) -> Option<CacheEntry> {
        self.inner.lock().unwrap().get(track).cloned()
    }

    /// Insert an entry, evicting the least recently used one when full.
    pub fn put(&self, track: TrackIdentity, entry: CacheEntry) {
        self.inner.lock().unwrap().put(track, entry);
    }
}
