//! Synthesis orchestrator — the public "speak now" entry point.
//!
//! # Resolution ladder
//!
//! ```text
//! speak(text, voice, rate)
//!   ├─ empty after trim ──────────▶ Err(EmptyInput), no I/O
//!   ├─ memory cache hit ──────────▶ play bytes            [Memory]
//!   ├─ persistent cache hit ──────▶ play URL; on failure fall through
//!   │                               (stale reference)     [Persistent]
//!   └─ network
//!        ├─ capability Supported ─▶ true-stream adapter
//!        │                           └─ any error ▶ buffered adapter,
//!        │                              reusing bytes already read
//!        ├─ capability Unsupported ▶ buffered adapter
//!        └─ stream/buffered dead ──▶ legacy one-shot endpoint
//!                                     └─ dead too ▶ Err(Unavailable)
//! ```
//!
//! On every successful resolution the result is written into *both* cache
//! tiers before returning.  The caller never learns which adapter served a
//! network resolution — only `served_from` and the completion event.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheKey, CachedAudio, MemoryCache, MemoryCacheEntry, PersistentCache};
use crate::config::EngineConfig;
use crate::playback::{
    AudioBlob, AudioOutput, MediaStore, PlaybackController, PlaybackFinished, PlaybackSource,
    StreamingSupport,
};

use super::client::{SynthesisClient, SynthesisStream};
use super::stream::{
    run_buffered, run_true_stream, StreamFallbackState, StreamPlayback, StreamTuning,
};

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Terminal failures of the synthesis path.  Everything recoverable
/// (capability gaps, adapter errors, stale cache references) is handled
/// inside [`Synthesizer::speak`] and never reaches the caller.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// The text was empty after trimming; no I/O was attempted.
    #[error("cannot speak empty text")]
    EmptyInput,

    /// Every strategy — streaming, buffered, legacy — failed.
    #[error("speech synthesis unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// ServedFrom / SpeakOutcome
// ---------------------------------------------------------------------------

/// Which tier resolved a successful `speak` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Memory,
    Persistent,
    Network,
}

/// Result of a successful `speak` call.
pub struct SpeakOutcome {
    pub served_from: ServedFrom,
    /// Resolves when playback ends (the authoritative completion event);
    /// used by the UI for "auto practice" chaining.
    pub finished: PlaybackFinished,
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Owns the cache tiers, the playback controller and the seam trait
/// objects; drives the full resolution ladder.
pub struct Synthesizer {
    client: Arc<dyn SynthesisClient>,
    output: Arc<dyn AudioOutput>,
    store: MediaStore,
    memory: MemoryCache,
    persistent: PersistentCache,
    controller: PlaybackController,
    tuning: StreamTuning,
}

impl Synthesizer {
    /// Create a synthesizer.
    ///
    /// # Arguments
    ///
    /// * `client`     — synthesis service client (e.g. `HttpSynthesisClient`).
    /// * `output`     — host audio backend.
    /// * `store`      — local media registry shared with `output` so that
    ///                  `local://` URLs resolve during playback.
    /// * `persistent` — the durable URL cache tier.
    /// * `config`     — engine configuration (cache bound, stream tunables).
    pub fn new(
        client: Arc<dyn SynthesisClient>,
        output: Arc<dyn AudioOutput>,
        store: MediaStore,
        persistent: PersistentCache,
        config: &EngineConfig,
    ) -> Self {
        Self {
            client,
            output,
            store,
            memory: MemoryCache::new(config.cache.memory_capacity),
            persistent,
            controller: PlaybackController::new(),
            tuning: StreamTuning::from(&config.stream),
        }
    }

    /// Speak `text` with `voice` at playback `rate`.
    ///
    /// Replaces the currently active playback.  The previous playback is
    /// stopped just before the replacement produces sound, so a call that
    /// fails outright (nothing playable anywhere) leaves it running.
    /// `rate` is forwarded to the synthesis service but is not part of the
    /// cache identity.
    pub async fn speak(
        &mut self,
        text: &str,
        voice: &str,
        rate: f32,
    ) -> Result<SpeakOutcome, SynthesisError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SynthesisError::EmptyInput);
        }
        let key = CacheKey::new(trimmed, voice);

        if let Some(outcome) = self.try_memory(&key).await {
            return Ok(outcome);
        }
        if let Some(outcome) = self.try_persistent(&key).await {
            return Ok(outcome);
        }
        self.from_network(&key, trimmed, voice, rate).await
    }

    /// Stop the active playback, if any.
    pub fn stop(&mut self) {
        self.controller.stop_current();
    }

    // -----------------------------------------------------------------------
    // Tier 1: memory
    // -----------------------------------------------------------------------

    async fn try_memory(&mut self, key: &CacheKey) -> Option<SpeakOutcome> {
        let entry = self.memory.take(key)?;

        let source = match &entry.audio {
            CachedAudio::Local { blob, .. } => PlaybackSource::Blob(Arc::clone(blob)),
            CachedAudio::Remote { url } => PlaybackSource::Url(url.clone()),
        };

        // Single-active invariant: the previous playback stops before the
        // replacement can become audible.
        self.controller.stop_current();
        match self.output.play(source).await {
            Ok(active) => {
                log::debug!("synth: memory cache hit for {key}");
                let finished = self.controller.start(active);

                // Refresh the persistent hint if it is missing, but never
                // clobber a durable remote reference with a session-scoped
                // local one.
                if self.persistent.lookup(key).is_none() {
                    let url = match &entry.audio {
                        CachedAudio::Local { media_url, .. } => media_url.as_str().to_string(),
                        CachedAudio::Remote { url } => url.clone(),
                    };
                    if let Err(e) = self.persistent.insert(key, &url) {
                        log::warn!("cache: persistent write failed: {e}");
                    }
                }

                // Delete+insert refresh of the memory tier.
                self.memory.insert(MemoryCacheEntry {
                    inserted_at: std::time::Instant::now(),
                    ..entry
                });

                Some(SpeakOutcome {
                    served_from: ServedFrom::Memory,
                    finished,
                })
            }
            Err(e) => {
                log::warn!("synth: memory entry for {key} failed to play ({e}), dropping it");
                drop(entry);
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tier 2: persistent
    // -----------------------------------------------------------------------

    async fn try_persistent(&mut self, key: &CacheKey) -> Option<SpeakOutcome> {
        let url = self.persistent.lookup(key)?.url.clone();

        // Advisory read: the play attempt is the validity probe.
        self.controller.stop_current();
        match self.output.play(PlaybackSource::Url(url.clone())).await {
            Ok(active) => {
                log::debug!("synth: persistent cache hit for {key}");
                let finished = self.controller.start(active);

                if let Err(e) = self.persistent.insert(key, &url) {
                    log::warn!("cache: persistent write failed: {e}");
                }
                self.memory.insert(MemoryCacheEntry::new(
                    key.clone(),
                    CachedAudio::Remote { url },
                ));

                Some(SpeakOutcome {
                    served_from: ServedFrom::Persistent,
                    finished,
                })
            }
            Err(e) => {
                log::debug!("synth: stale persistent reference for {key} ({e}), going to network");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tier 3: network
    // -----------------------------------------------------------------------

    async fn from_network(
        &mut self,
        key: &CacheKey,
        text: &str,
        voice: &str,
        rate: f32,
    ) -> Result<SpeakOutcome, SynthesisError> {
        match self.client.open_stream(text, voice, rate).await {
            Ok(stream) => {
                if let Some(outcome) = self.try_adapters(key, stream).await {
                    return Ok(outcome);
                }
            }
            Err(e) => {
                log::warn!("synth: stream open failed ({e}), trying legacy endpoint");
            }
        }
        self.from_legacy(key, text, voice, rate).await
    }

    /// True-stream first when the capability probe allows it, buffered
    /// otherwise — and buffered again as the in-flight fallback, reusing
    /// every byte the failed attempt already read.
    async fn try_adapters(&mut self, key: &CacheKey, stream: SynthesisStream) -> Option<SpeakOutcome> {
        // Both adapters produce sound mid-run (opportunistic start on the
        // streaming path); stop the previous playback before either does.
        self.controller.stop_current();

        let durable_url = stream.durable_url.clone();
        let fallback = match self.output.streaming_support(&stream.mime) {
            StreamingSupport::Supported { codec } => {
                log::debug!("synth: true-stream attempt for {key} ({codec})");
                match run_true_stream(self.output.as_ref(), stream, &self.tuning).await {
                    Ok(played) => {
                        return Some(self.finish_streamed(key, played, durable_url));
                    }
                    Err(state) => {
                        log::warn!(
                            "synth: true-stream failed for {key} ({}), degrading to buffered",
                            state.reason
                        );
                        state
                    }
                }
            }
            StreamingSupport::Unsupported => StreamFallbackState {
                bytes_so_far: Vec::new(),
                stream,
                reason: "incremental playback unsupported".into(),
            },
        };

        match run_buffered(
            self.output.as_ref(),
            &self.store,
            fallback.bytes_so_far,
            fallback.stream,
            &self.tuning,
        )
        .await
        {
            Ok(played) => {
                let finished = self.controller.start(played.active);
                let url = durable_url.unwrap_or_else(|| played.media_url.as_str().to_string());
                if let Err(e) = self.persistent.insert(key, &url) {
                    log::warn!("cache: persistent write failed: {e}");
                }
                self.memory.insert(MemoryCacheEntry::new(
                    key.clone(),
                    CachedAudio::Local {
                        blob: played.blob,
                        media_url: played.media_url,
                    },
                ));
                Some(SpeakOutcome {
                    served_from: ServedFrom::Network,
                    finished,
                })
            }
            Err(e) => {
                log::warn!("synth: buffered adapter failed for {key} ({e})");
                None
            }
        }
    }

    /// Cache write-back + controller hand-off for a successful true stream.
    fn finish_streamed(
        &mut self,
        key: &CacheKey,
        played: StreamPlayback,
        durable_url: Option<String>,
    ) -> SpeakOutcome {
        let StreamPlayback {
            bytes,
            mime,
            active,
        } = played;

        let finished = self.controller.start(active);

        // Streaming and caching are decoupled: the full accumulation is
        // always assembled for the tiers, whatever played it.
        let blob = Arc::new(AudioBlob::new(bytes, mime));
        let media_url = self.store.register(Arc::clone(&blob));
        let url = durable_url.unwrap_or_else(|| media_url.as_str().to_string());
        if let Err(e) = self.persistent.insert(key, &url) {
            log::warn!("cache: persistent write failed: {e}");
        }
        self.memory.insert(MemoryCacheEntry::new(
            key.clone(),
            CachedAudio::Local { blob, media_url },
        ));

        SpeakOutcome {
            served_from: ServedFrom::Network,
            finished,
        }
    }

    /// Terminal fallback: the non-streaming endpoint and its hosted URL.
    async fn from_legacy(
        &mut self,
        key: &CacheKey,
        text: &str,
        voice: &str,
        rate: f32,
    ) -> Result<SpeakOutcome, SynthesisError> {
        let audio = self
            .client
            .synthesize(text, voice, rate)
            .await
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))?;

        self.controller.stop_current();
        let active = self
            .output
            .play(PlaybackSource::Url(audio.audio_url.clone()))
            .await
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))?;

        log::debug!("synth: legacy endpoint served {key}");
        let finished = self.controller.start(active);

        if let Err(e) = self.persistent.insert(key, &audio.audio_url) {
            log::warn!("cache: persistent write failed: {e}");
        }
        self.memory.insert(MemoryCacheEntry::new(
            key.clone(),
            CachedAudio::Remote {
                url: audio.audio_url,
            },
        ));

        Ok(SpeakOutcome {
            served_from: ServedFrom::Network,
            finished,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
