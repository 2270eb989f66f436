//! Playback and recording control surface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 AudioOutput (trait, host-supplied)        │
//! │                                                          │
//! │  streaming_support(mime) ──▶ Supported{codec}|Unsupported│
//! │  open_media_buffer(mime) ──▶ MediaBuffer (append-only)   │
//! │  play(source)            ──▶ ActiveAudio (wait_ended)    │
//! └──────────────────────────────────────────────────────────┘
//!            ▲                          ▲
//!            │                          │ at most ONE active
//!       MediaStore                PlaybackController
//!   (local:// object table)     RecordingController
//! ```
//!
//! The engine drives whatever audio backend the host application provides;
//! the controllers enforce the single-active-resource invariant for both
//! playback and microphone capture.

pub mod controller;
pub mod output;
pub mod store;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use controller::{
    PlaybackController, PlaybackFinished, RecordingController, RecordingHandle,
};
pub use output::{
    ActiveAudio, AudioBlob, AudioOutput, MediaBuffer, PlaybackError, PlaybackOutcome,
    PlaybackSource, StreamingSupport,
};
pub use store::{MediaStore, MediaUrl, LOCAL_URL_SCHEME};

// test-only re-export so other modules' tests can import the mocks without
// `use crate::playback::output::mock::…`.
#[cfg(test)]
pub use output::mock;
