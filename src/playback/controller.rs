//! Single-active-resource controllers for playback and recording.
//!
//! At most one playback and one recording may be live at any moment.
//! Both invariants are enforced at one chokepoint each: installing a new
//! resource synchronously stops and releases the previous holder before
//! the new one is visible.  No other code stops audio or microphones.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::output::{ActiveAudio, PlaybackOutcome};

// ---------------------------------------------------------------------------
// PlaybackFinished
// ---------------------------------------------------------------------------

/// One-shot completion event for a playback started through the controller.
///
/// Resolves with [`PlaybackOutcome::Ended`] on natural completion, or
/// [`PlaybackOutcome::Interrupted`] when the playback was replaced or
/// explicitly stopped.  This is the only completion signal the engine
/// exposes — callers chain "auto practice" off it.
pub struct PlaybackFinished {
    rx: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackFinished {
    pub async fn wait(self) -> PlaybackOutcome {
        self.rx.await.unwrap_or(PlaybackOutcome::Interrupted)
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// Owns the at-most-one active playback.
#[derive(Default)]
pub struct PlaybackController {
    current: Option<Arc<dyn ActiveAudio>>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` as the active playback.
    ///
    /// Any previous playback is stopped *before* the new handle is
    /// installed, so two playbacks can never be audible at once.
    ///
    /// Must be called from within a tokio runtime (a watcher task is
    /// spawned to observe the handle's completion).
    pub fn start(&mut self, handle: Arc<dyn ActiveAudio>) -> PlaybackFinished {
        self.stop_current();

        let (tx, rx) = oneshot::channel();
        let watched = Arc::clone(&handle);
        tokio::spawn(async move {
            let outcome = watched.wait_ended().await;
            let _ = tx.send(outcome);
        });

        self.current = Some(handle);
        PlaybackFinished { rx }
    }

    /// Stop and release the active playback, if any.  Idempotent.
    pub fn stop_current(&mut self) {
        if let Some(previous) = self.current.take() {
            log::debug!("playback: stopping previous playback");
            previous.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

// ---------------------------------------------------------------------------
// RecordingController
// ---------------------------------------------------------------------------

/// A live microphone capture owned by the embedding application.
pub trait RecordingHandle: Send {
    /// Stop capturing and release the microphone stream.
    fn stop(&mut self);
}

/// Owns the at-most-one active recording; same discipline as playback.
#[derive(Default)]
pub struct RecordingController {
    current: Option<Box<dyn RecordingHandle>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` as the active recording, tearing down any prior one.
    pub fn start(&mut self, handle: Box<dyn RecordingHandle>) {
        self.stop_current();
        self.current = Some(handle);
    }

    /// Stop and release the active recording, if any.  Idempotent.
    pub fn stop_current(&mut self) {
        if let Some(mut previous) = self.current.take() {
            log::debug!("recording: stopping previous capture");
            previous.stop();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
