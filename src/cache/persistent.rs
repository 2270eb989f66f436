//! Persistent key→URL cache surviving process restarts.
//!
//! Stores *references*, never audio bytes: for each `(text, voice)` key the
//! last known playable URL plus the time it was last verified.  Reads are
//! advisory — a stored URL may point at an expired server resource or a
//! `local://` object from a previous session, so consumers must validate
//! with a play attempt and fall through on failure rather than treating a
//! stale reference as a hard error.
//!
//! Serialised as a flat JSON map in the engine config directory.  A missing
//! or corrupt file is tolerated: the cache starts empty and logs a warning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::CacheKey;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Errors from persistent-cache I/O.  Lookup never produces one — only
/// writes can fail, and callers downgrade even those to warnings.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// PersistentEntry
// ---------------------------------------------------------------------------

/// One stored reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentEntry {
    /// Last known playable URL for the key (remote or `local://`).
    pub url: String,
    /// Unix seconds when the URL last resolved successfully.
    pub last_verified_at: u64,
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// PersistentCache
// ---------------------------------------------------------------------------

/// Durable key-value store of synthesis URLs.
pub struct PersistentCache {
    path: PathBuf,
    entries: HashMap<String, PersistentEntry>,
}

impl PersistentCache {
    /// Open the cache at `path`, loading any existing entries.
    ///
    /// A missing file yields an empty cache; a corrupt file is discarded
    /// with a warning (the cache is a hint store, losing it costs one
    /// network round trip per key, nothing more).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("cache: discarding corrupt url cache ({e})");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, entries }
    }

    /// Advisory lookup — presence does not guarantee playability.
    pub fn lookup(&self, key: &CacheKey) -> Option<&PersistentEntry> {
        self.entries.get(&key.storage_key())
    }

    /// Store `url` for `key` (last-write-wins, idempotent) and flush.
    pub fn insert(&mut self, key: &CacheKey, url: &str) -> Result<(), CacheError> {
        self.entries.insert(
            key.storage_key(),
            PersistentEntry {
                url: url.to_string(),
                last_verified_at: now_unix_secs(),
            },
        );
        self.save()
    }

    fn save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
