//! Audio-output seam traits and capability probing.
//!
//! # Overview
//!
//! The engine never touches an audio device directly.  The embedding
//! application supplies an [`AudioOutput`] implementation (web runtime,
//! rodio, cpal — whatever the host has) and the engine drives it through
//! three narrow traits:
//!
//! - [`AudioOutput`] — capability query + two ways to produce sound:
//!   an incremental [`MediaBuffer`], or one-shot [`play`](AudioOutput::play).
//! - [`MediaBuffer`] — an append-only media sink.  **`append` is not
//!   reentrant**; callers must serialize appends (the streaming adapter
//!   does this through a single-consumer queue).
//! - [`ActiveAudio`] — a live playback.  [`wait_ended`](ActiveAudio::wait_ended)
//!   is the single authoritative completion event; there is no log-sniffing
//!   or audibility polling anywhere in the engine.
//!
//! Mock implementations (available under `#[cfg(test)]`) let the rest of
//! the crate be unit-tested without any audio hardware.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// All errors that can arise from the audio-output backend.
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    /// The backend cannot play the given MIME type at all.
    #[error("audio output does not support '{0}'")]
    Unsupported(String),

    /// A media-buffer append was rejected by the backend.
    #[error("media buffer append failed: {0}")]
    Append(String),

    /// The sink failed while opening or playing.
    #[error("audio sink error: {0}")]
    Sink(String),

    /// The playback source (a URL) could not be resolved or fetched.
    #[error("audio source unavailable: {0}")]
    SourceUnavailable(String),
}

// ---------------------------------------------------------------------------
// AudioBlob / PlaybackSource
// ---------------------------------------------------------------------------

/// A fully assembled audio object: raw bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    /// Encoded audio bytes exactly as received from the synthesis service.
    pub data: Vec<u8>,
    /// MIME type of `data` (e.g. `audio/mpeg`).
    pub mime: String,
}

impl AudioBlob {
    pub fn new(data: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            data,
            mime: mime.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What an [`AudioOutput`] should play.
#[derive(Debug, Clone)]
pub enum PlaybackSource {
    /// An in-memory audio object.
    Blob(Arc<AudioBlob>),
    /// A URL — `local://…` (resolved through the `MediaStore`) or remote
    /// `http(s)://…`.  Playing a URL doubles as its validity probe: stale
    /// references fail here and the caller falls through to the next tier.
    Url(String),
}

// ---------------------------------------------------------------------------
// StreamingSupport
// ---------------------------------------------------------------------------

/// Result of the incremental-playback capability probe.
///
/// Queried once at adapter-selection time, never re-checked mid-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamingSupport {
    /// The backend can append this codec incrementally while playing.
    Supported {
        /// The concrete codec string the backend negotiated.
        codec: String,
    },
    /// No incremental-media-buffer capability; only buffered playback works.
    Unsupported,
}

impl StreamingSupport {
    pub fn is_supported(&self) -> bool {
        matches!(self, StreamingSupport::Supported { .. })
    }
}

// ---------------------------------------------------------------------------
// PlaybackOutcome / ActiveAudio
// ---------------------------------------------------------------------------

/// How a playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The audio played to its natural end.
    Ended,
    /// The audio was stopped before its natural end (replaced or cancelled).
    Interrupted,
}

/// A live playback.
///
/// Implementations must resolve [`wait_ended`](Self::wait_ended) for *any*
/// end of playback — natural completion or [`stop`](Self::stop) — so that
/// no caller ever waits forever on a dead sink.
#[async_trait]
pub trait ActiveAudio: Send + Sync {
    /// Wait for the playback to end, reporting how it ended.
    async fn wait_ended(&self) -> PlaybackOutcome;

    /// Stop playback immediately and release the underlying sink.
    ///
    /// Must be synchronous and idempotent.
    fn stop(&self);
}

// ---------------------------------------------------------------------------
// MediaBuffer
// ---------------------------------------------------------------------------

/// An incremental media sink: bytes go in while audio comes out.
///
/// `append` must never be called again before the previous append has
/// resolved — the underlying primitive is not reentrant.  The streaming
/// adapter enforces this with a serialized drain loop.
#[async_trait]
pub trait MediaBuffer: Send {
    /// Append one chunk; resolves when the sink has accepted it.
    async fn append(&mut self, chunk: Bytes) -> Result<(), PlaybackError>;

    /// Start audible playback of whatever has been appended so far.
    async fn begin_playback(&mut self) -> Result<(), PlaybackError>;

    /// Signal that no more bytes will arrive.
    async fn end_of_stream(&mut self) -> Result<(), PlaybackError>;

    /// Convert the buffer into its live playback handle.
    ///
    /// Also the teardown path: callers abandoning a sink mid-stream call
    /// this and then [`ActiveAudio::stop`], which must silence any output
    /// the sink already made audible.
    fn into_active(self: Box<Self>) -> Arc<dyn ActiveAudio>;
}

// ---------------------------------------------------------------------------
// AudioOutput
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the host's audio backend.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn AudioOutput>` and called from any task.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Probe whether this backend can play `mime` incrementally.
    fn streaming_support(&self, mime: &str) -> StreamingSupport;

    /// Open an incremental media sink for `mime`.
    ///
    /// Only meaningful when [`streaming_support`](Self::streaming_support)
    /// returned `Supported`; backends may still fail here at runtime.
    async fn open_media_buffer(&self, mime: &str) -> Result<Box<dyn MediaBuffer>, PlaybackError>;

    /// Play a fully assembled source from start to finish.
    async fn play(&self, source: PlaybackSource) -> Result<Arc<dyn ActiveAudio>, PlaybackError>;
}

// Compile-time assertion: Box<dyn AudioOutput> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioOutput>) {}
};

// ---------------------------------------------------------------------------
// Mocks  (test-only)
// ---------------------------------------------------------------------------

/// Test doubles for the audio-output seam.
///
/// [`MockOutput`] records every interaction in a shared event log and can
/// inject append failures at a chosen chunk index, which is how the adapter
/// fallback paths are exercised without real hardware.
#[cfg(test)]
pub mod mock {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::watch;

    use super::*;
    use crate::playback::store::MediaStore;

    /// Shared, lockable event log used across mock objects.
    pub type EventLog = Arc<Mutex<Vec<String>>>;

    pub fn new_event_log() -> EventLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    // -- MockActive ---------------------------------------------------------

    /// A playback handle whose lifecycle is fully scripted.
    pub struct MockActive {
        label: String,
        events: EventLog,
        tx: watch::Sender<Option<PlaybackOutcome>>,
    }

    impl MockActive {
        /// A playback that ends naturally as soon as anyone waits on it.
        pub fn ending(label: impl Into<String>, events: EventLog) -> Arc<Self> {
            let me = Self::manual(label, events);
            me.tx.send_replace(Some(PlaybackOutcome::Ended));
            me
        }

        /// A playback that stays live until `finish()` or `stop()`.
        pub fn manual(label: impl Into<String>, events: EventLog) -> Arc<Self> {
            let (tx, _rx) = watch::channel(None);
            Arc::new(Self {
                label: label.into(),
                events,
                tx,
            })
        }

        /// Simulate the audio reaching its natural end.
        pub fn finish(&self) {
            // send_replace stores the value even with no live receiver, so
            // an outcome signalled before anyone waits is never lost.
            self.tx.send_replace(Some(PlaybackOutcome::Ended));
        }
    }

    #[async_trait]
    impl ActiveAudio for MockActive {
        async fn wait_ended(&self) -> PlaybackOutcome {
            let mut rx = self.tx.subscribe();
            loop {
                if let Some(outcome) = *rx.borrow() {
                    return outcome;
                }
                if rx.changed().await.is_err() {
                    return PlaybackOutcome::Interrupted;
                }
            }
        }

        fn stop(&self) {
            self.events
                .lock()
                .unwrap()
                .push(format!("stop:{}", self.label));
            self.tx.send_replace(Some(PlaybackOutcome::Interrupted));
        }
    }

    // -- MockMediaBuffer ----------------------------------------------------

    /// An append-only sink that records chunks and can fail on demand.
    pub struct MockMediaBuffer {
        appended: Arc<Mutex<Vec<Bytes>>>,
        fail_append_at: Option<usize>,
        events: EventLog,
        active: Arc<MockActive>,
    }

    #[async_trait]
    impl MediaBuffer for MockMediaBuffer {
        async fn append(&mut self, chunk: Bytes) -> Result<(), PlaybackError> {
            let mut appended = self.appended.lock().unwrap();
            if self.fail_append_at == Some(appended.len()) {
                return Err(PlaybackError::Append("injected append failure".into()));
            }
            self.events
                .lock()
                .unwrap()
                .push(format!("append:{}", appended.len()));
            appended.push(chunk);
            Ok(())
        }

        async fn begin_playback(&mut self) -> Result<(), PlaybackError> {
            self.events.lock().unwrap().push("begin".into());
            Ok(())
        }

        async fn end_of_stream(&mut self) -> Result<(), PlaybackError> {
            self.events.lock().unwrap().push("eos".into());
            Ok(())
        }

        fn into_active(self: Box<Self>) -> Arc<dyn ActiveAudio> {
            self.active
        }
    }

    // -- MockOutput ---------------------------------------------------------

    /// Scriptable [`AudioOutput`] backend.
    pub struct MockOutput {
        support: StreamingSupport,
        store: MediaStore,
        playable_remote: Mutex<HashSet<String>>,
        fail_append_at: Option<usize>,
        pub events: EventLog,
        /// Chunks appended through media buffers, in append order.
        pub appended: Arc<Mutex<Vec<Bytes>>>,
        pub play_calls: AtomicUsize,
    }

    impl MockOutput {
        pub fn new(support: StreamingSupport, store: MediaStore) -> Self {
            Self {
                support,
                store,
                playable_remote: Mutex::new(HashSet::new()),
                fail_append_at: None,
                events: new_event_log(),
                appended: Arc::new(Mutex::new(Vec::new())),
                play_calls: AtomicUsize::new(0),
            }
        }

        /// Streaming-capable backend for `audio/mpeg`.
        pub fn streaming(store: MediaStore) -> Self {
            Self::new(
                StreamingSupport::Supported {
                    codec: "audio/mpeg".into(),
                },
                store,
            )
        }

        /// Buffered-only backend.
        pub fn buffered_only(store: MediaStore) -> Self {
            Self::new(StreamingSupport::Unsupported, store)
        }

        /// Make every media buffer fail its `index`-th append.
        pub fn fail_append_at(mut self, index: usize) -> Self {
            self.fail_append_at = Some(index);
            self
        }

        /// Mark a remote URL as playable.
        pub fn allow_url(&self, url: &str) {
            self.playable_remote.lock().unwrap().insert(url.into());
        }

        pub fn appended_bytes(&self) -> Vec<u8> {
            self.appended
                .lock()
                .unwrap()
                .iter()
                .flat_map(|b| b.iter().copied())
                .collect()
        }
    }

    #[async_trait]
    impl AudioOutput for MockOutput {
        fn streaming_support(&self, _mime: &str) -> StreamingSupport {
            self.support.clone()
        }

        async fn open_media_buffer(
            &self,
            mime: &str,
        ) -> Result<Box<dyn MediaBuffer>, PlaybackError> {
            if !self.support.is_supported() {
                return Err(PlaybackError::Unsupported(mime.into()));
            }
            self.events.lock().unwrap().push("open-buffer".into());
            Ok(Box::new(MockMediaBuffer {
                appended: Arc::clone(&self.appended),
                fail_append_at: self.fail_append_at,
                events: Arc::clone(&self.events),
                active: MockActive::ending("stream", Arc::clone(&self.events)),
            }))
        }

        async fn play(&self, source: PlaybackSource) -> Result<Arc<dyn ActiveAudio>, PlaybackError> {
            self.play_calls.fetch_add(1, Ordering::SeqCst);
            let label = match source {
                PlaybackSource::Blob(blob) => format!("blob:{}b", blob.len()),
                PlaybackSource::Url(url) => {
                    let resolvable = if url.starts_with(crate::playback::store::LOCAL_URL_SCHEME) {
                        self.store.resolve(&url).is_some()
                    } else {
                        self.playable_remote.lock().unwrap().contains(&url)
                    };
                    if !resolvable {
                        return Err(PlaybackError::SourceUnavailable(url));
                    }
                    format!("url:{url}")
                }
            };
            self.events.lock().unwrap().push(format!("play:{label}"));
            Ok(MockActive::ending(label, Arc::clone(&self.events)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
