//! Bounded in-process cache of recent synthesis results.
//!
//! Entries are kept in insertion order; inserting beyond capacity evicts
//! the oldest entry.  Entries are never mutated in place — a refresh is
//! always take-out + insert.  Dropping an evicted entry drops its
//! [`MediaUrl`] guard, which revokes the derived `local://` resource, so
//! the cache can never leak local audio objects.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::playback::{AudioBlob, MediaUrl};

use super::key::CacheKey;

// ---------------------------------------------------------------------------
// CachedAudio / MemoryCacheEntry
// ---------------------------------------------------------------------------

/// What a memory-cache entry actually holds.
pub enum CachedAudio {
    /// Raw bytes plus the locally derived playable reference for them.
    Local {
        blob: Arc<AudioBlob>,
        media_url: MediaUrl,
    },
    /// A remote URL believed playable (e.g. served by the legacy endpoint).
    Remote { url: String },
}

/// One cached synthesis result.
pub struct MemoryCacheEntry {
    pub key: CacheKey,
    pub audio: CachedAudio,
    pub inserted_at: Instant,
}

impl MemoryCacheEntry {
    pub fn new(key: CacheKey, audio: CachedAudio) -> Self {
        Self {
            key,
            audio,
            inserted_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// Bounded insertion-order cache.
///
/// Lookups do not reorder entries; only insertion refreshes recency.
pub struct MemoryCache {
    entries: VecDeque<MemoryCacheEntry>,
    capacity: usize,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "MemoryCache capacity must be > 0");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Borrow the entry for `key`, if present.
    pub fn lookup(&self, key: &CacheKey) -> Option<&MemoryCacheEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    /// Remove and return the entry for `key`, if present.
    ///
    /// Used by the orchestrator to implement delete+insert refresh.
    pub fn take(&mut self, key: &CacheKey) -> Option<MemoryCacheEntry> {
        let idx = self.entries.iter().position(|e| &e.key == key)?;
        self.entries.remove(idx)
    }

    /// Insert `entry`, replacing any entry with the same key and evicting
    /// the oldest entry when the bound would be exceeded.
    pub fn insert(&mut self, entry: MemoryCacheEntry) {
        // Replacement is delete+insert, never in-place mutation.
        if let Some(existing) = self.take(&entry.key) {
            drop(existing);
        }

        self.entries.push_back(entry);

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!("cache: evicting memory entry {}", evicted.key);
                // Dropping the entry drops its MediaUrl guard, revoking any
                // locally derived resource.
                drop(evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::MediaStore;

    fn local_entry(store: &MediaStore, text: &str) -> MemoryCacheEntry {
        let blob = Arc::new(AudioBlob::new(vec![1, 2, 3], "audio/mpeg"));
        let media_url = store.register(Arc::clone(&blob));
        MemoryCacheEntry::new(
            CacheKey::new(text, "Nova"),
            CachedAudio::Local { blob, media_url },
        )
    }

    #[test]
    fn lookup_hit_and_miss() {
        let store = MediaStore::new();
        let mut cache = MemoryCache::new(10);
        cache.insert(local_entry(&store, "hello"));

        assert!(cache.lookup(&CacheKey::new("Hello ", "Nova")).is_some());
        assert!(cache.lookup(&CacheKey::new("hello", "Aria")).is_none());
    }

    /// Inserting an 11th distinct entry must evict exactly the oldest entry
    /// and release its derived local resource.
    #[test]
    fn eviction_bound_and_resource_release() {
        let store = MediaStore::new();
        let mut cache = MemoryCache::new(10);

        for i in 0..11 {
            cache.insert(local_entry(&store, &format!("sentence {i}")));
        }

        assert_eq!(cache.len(), 10);
        // The oldest entry is gone; the other ten remain.
        assert!(cache
            .lookup(&CacheKey::new("sentence 0", "Nova"))
            .is_none());
        assert!(cache
            .lookup(&CacheKey::new("sentence 1", "Nova"))
            .is_some());
        assert!(cache
            .lookup(&CacheKey::new("sentence 10", "Nova"))
            .is_some());
        // Exactly one local:// registration was revoked.
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn same_key_replaces_without_growing() {
        let store = MediaStore::new();
        let mut cache = MemoryCache::new(10);

        cache.insert(local_entry(&store, "hello"));
        cache.insert(local_entry(&store, "hello"));

        assert_eq!(cache.len(), 1);
        // The replaced entry's local url was revoked with it.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn take_removes_the_entry() {
        let store = MediaStore::new();
        let mut cache = MemoryCache::new(10);
        cache.insert(local_entry(&store, "hello"));

        let key = CacheKey::new("hello", "Nova");
        let entry = cache.take(&key).expect("entry present");
        assert_eq!(entry.key, key);
        assert!(cache.is_empty());
        // The guard is still alive inside the taken entry.
        assert_eq!(store.len(), 1);

        drop(entry);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn remote_entries_hold_no_local_resource() {
        let store = MediaStore::new();
        let mut cache = MemoryCache::new(1);

        cache.insert(MemoryCacheEntry::new(
            CacheKey::new("hello", "Nova"),
            CachedAudio::Remote {
                url: "https://cdn.example.com/a.mp3".into(),
            },
        ));
        cache.insert(local_entry(&store, "bye"));

        assert_eq!(cache.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    #[should_panic(expected = "MemoryCache capacity must be > 0")]
    fn zero_capacity_panics() {
        let _ = MemoryCache::new(0);
    }
}
