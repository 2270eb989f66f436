//! Speech synthesis: service client, stream adapters and the orchestrator.
//!
//! # Resolution order
//!
//! [`Synthesizer::speak`] resolves strictly memory → persistent → network.
//! A network resolution picks its transport by capability: the true-stream
//! adapter when the backend can play the codec incrementally, the buffered
//! adapter otherwise or on any streaming failure, and the legacy one-shot
//! endpoint as the terminal fallback.  Strategy selection is invisible to
//! callers; they only observe [`ServedFrom`] and the completion event.

pub mod client;
pub mod orchestrator;
mod stream;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use client::{
    AudioChunkStream, HttpSynthesisClient, SynthesisClient, SynthesisStream, SynthesizedAudio,
    TransportError,
};
pub use orchestrator::{ServedFrom, SpeakOutcome, SynthesisError, Synthesizer};

#[cfg(test)]
pub use client::mock;
