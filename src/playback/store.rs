//! Process-wide registry of locally derived audio objects.
//!
//! [`MediaStore`] is the engine's analogue of the browser object-URL table:
//! a blob assembled from network bytes is registered once and addressed by
//! a session-scoped `local://<id>` URL.  The returned [`MediaUrl`] is an
//! RAII guard — dropping it revokes the URL, so evicting a cache entry can
//! never leak a local playable resource.
//!
//! Local URLs are deliberately *not* durable: a `local://` reference
//! persisted by a previous process fails [`MediaStore::resolve`] in the
//! next one, which is exactly the staleness the persistent cache tier is
//! required to tolerate.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::output::AudioBlob;

/// URL scheme for locally derived audio objects.
pub const LOCAL_URL_SCHEME: &str = "local://";

// ---------------------------------------------------------------------------
// MediaStore
// ---------------------------------------------------------------------------

/// Cheap-to-clone handle to the shared local-audio registry.
#[derive(Clone, Default)]
pub struct MediaStore {
    inner: Arc<Mutex<HashMap<String, Arc<AudioBlob>>>>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `blob` and return the guard holding its `local://` URL.
    ///
    /// The blob stays resolvable until the returned [`MediaUrl`] is dropped.
    pub fn register(&self, blob: Arc<AudioBlob>) -> MediaUrl {
        let url = format!("{LOCAL_URL_SCHEME}{}", Uuid::new_v4());
        self.inner.lock().unwrap().insert(url.clone(), blob);
        log::debug!("playback: registered {url}");
        MediaUrl {
            url,
            store: Arc::clone(&self.inner),
        }
    }

    /// Resolve a `local://` URL back to its blob, if still registered.
    pub fn resolve(&self, url: &str) -> Option<Arc<AudioBlob>> {
        self.inner.lock().unwrap().get(url).cloned()
    }

    /// Number of currently registered local audio objects.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStore")
            .field("entries", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// MediaUrl
// ---------------------------------------------------------------------------

/// Owning guard for one `local://` URL.  Dropping it revokes the URL.
pub struct MediaUrl {
    url: String,
    store: Arc<Mutex<HashMap<String, Arc<AudioBlob>>>>,
}

impl MediaUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl fmt::Debug for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MediaUrl").field(&self.url).finish()
    }
}

impl Drop for MediaUrl {
    fn drop(&mut self) {
        self.store.lock().unwrap().remove(&self.url);
        log::debug!("playback: revoked {}", self.url);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> Arc<AudioBlob> {
        Arc::new(AudioBlob::new(vec![0xFF, 0xFB, 0x90], "audio/mpeg"))
    }

    #[test]
    fn register_then_resolve() {
        let store = MediaStore::new();
        let url = store.register(blob());

        assert!(url.as_str().starts_with(LOCAL_URL_SCHEME));
        let resolved = store.resolve(url.as_str()).expect("must resolve");
        assert_eq!(resolved.data, vec![0xFF, 0xFB, 0x90]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn drop_revokes_url() {
        let store = MediaStore::new();
        let url = store.register(blob());
        let url_string = url.as_str().to_string();

        drop(url);

        assert!(store.resolve(&url_string).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn urls_are_unique_per_registration() {
        let store = MediaStore::new();
        let a = store.register(blob());
        let b = store.register(blob());

        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unknown_url_does_not_resolve() {
        let store = MediaStore::new();
        assert!(store.resolve("local://never-registered").is_none());
    }

    #[test]
    fn clones_share_the_registry() {
        let store = MediaStore::new();
        let clone = store.clone();
        let _url = store.register(blob());

        assert_eq!(clone.len(), 1);
    }
}
