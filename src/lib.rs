//! Adaptive audio streaming and caching engine for pronunciation practice.
//!
//! # Architecture
//!
//! ```text
//! speak(text, voice, rate)
//!   └─▶ Synthesizer ──▶ MemoryCache ──▶ PersistentCache ──▶ network
//!         │                                                   │
//!         │                               true-stream ◀── capability probe
//!         │                                   │ fallback (bytes kept)
//!         │                               buffered ──▶ legacy endpoint
//!         ▼
//!   PlaybackController ──▶ AudioOutput (host-supplied)
//!
//! begin / feed_chunk* / stop
//!   └─▶ AssessmentSession ──▶ streaming init/chunk/finalize
//!                               │ fallback (accumulated audio)
//!                             batch scoring
//! ```
//!
//! The engine is I/O-only: it owns no audio device and no UI.  The host
//! application supplies an [`AudioOutput`](playback::AudioOutput)
//! implementation and a recording source; the engine supplies caching,
//! adaptive streaming, scoring sessions and the single-active-resource
//! discipline for playback and recording.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pronounce_engine::config::{AppPaths, EngineConfig};
//! use pronounce_engine::cache::PersistentCache;
//! use pronounce_engine::playback::MediaStore;
//! use pronounce_engine::synth::{HttpSynthesisClient, Synthesizer};
//!
//! # async fn run(output: Arc<dyn pronounce_engine::playback::AudioOutput>) {
//! let config = EngineConfig::load().unwrap();
//! let store = MediaStore::new();
//! let client = Arc::new(HttpSynthesisClient::from_config(&config.synthesis));
//! let persistent = PersistentCache::open(AppPaths::new().url_cache_file);
//!
//! let mut synth = Synthesizer::new(client, output, store, persistent, &config);
//! let outcome = synth.speak("Hello world", "Nova", 1.0).await.unwrap();
//! outcome.finished.wait().await;
//! # }
//! ```

pub mod assess;
pub mod cache;
pub mod config;
pub mod playback;
pub mod synth;

// ── Top-level re-exports ───────────────────────────────────────────────────

pub use assess::{AssessmentError, AssessmentResult, AssessmentSession};
pub use config::EngineConfig;
pub use playback::{PlaybackFinished, PlaybackOutcome};
pub use synth::{ServedFrom, SpeakOutcome, SynthesisError, Synthesizer};
