//! Streaming assessment session state machine.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ─begin─▶ AwaitingInit ─init ack──────────▶ Active
//!                              │                             │
//!                              └─init failure (tolerated)──▶ Active
//!                                 (accumulate-only mode)     │ feed_chunk*
//!                                                            ▼
//!                        Closed ◀─finalize ok / fallback── Finalizing ◀─stop
//! ```
//!
//! Init failure is non-fatal: some deployments lack the server-side
//! streaming capability while batch scoring remains reliable, so the
//! session simply accumulates locally and relies on the fallback at
//! `stop` time.  Chunk-upload failures are logged and ignored for the
//! same reason — the local accumulation is the source of truth.
//!
//! Chunks are fed through `&mut self`, so chunk *N*'s upload completes
//! before chunk *N+1* can be issued; the fallback blob is therefore
//! always a strict index-order concatenation.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use uuid::Uuid;

use super::client::AssessmentClient;
use super::result::AssessmentResult;

// ---------------------------------------------------------------------------
// AssessmentError
// ---------------------------------------------------------------------------

/// Terminal failures of the assessment path.
#[derive(Debug, Clone, Error)]
pub enum AssessmentError {
    /// `stop` was called before any audio chunk was fed.
    #[error("no audio was recorded")]
    InsufficientAudio,

    /// Both the streaming finalize and the batch fallback failed.
    #[error("pronunciation assessment unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    AwaitingInit,
    Active,
    Finalizing,
    Closed,
}

// ---------------------------------------------------------------------------
// AssessmentSession
// ---------------------------------------------------------------------------

/// One streaming scoring attempt for one recording.
///
/// Created by [`begin`](Self::begin), consumed by [`stop`](Self::stop).
/// The caller only ever feeds chunks and stops; everything else —
/// session identity, accumulation, fallback — is internal.
pub struct AssessmentSession {
    client: Arc<dyn AssessmentClient>,
    session_id: String,
    reference_text: String,
    strict_mode: bool,
    chunk_index: usize,
    accumulated: Vec<Vec<u8>>,
    /// Whether the server acknowledged `init`; gates chunk forwarding.
    streaming_live: bool,
    state: SessionState,
}

impl AssessmentSession {
    /// Start a session for scoring `reference_text`.
    ///
    /// Attempts a server `init`; failure is tolerated and leaves the
    /// session in accumulate-only mode.
    pub async fn begin(
        client: Arc<dyn AssessmentClient>,
        reference_text: &str,
        strict_mode: bool,
    ) -> Self {
        let mut session = Self {
            client,
            session_id: new_session_id(),
            reference_text: reference_text.to_string(),
            strict_mode,
            chunk_index: 0,
            accumulated: Vec::new(),
            streaming_live: false,
            state: SessionState::Uninitialized,
        };

        session.state = SessionState::AwaitingInit;
        match session
            .client
            .init(&session.session_id, reference_text, strict_mode)
            .await
        {
            Ok(()) => {
                log::debug!("assess: session {} initialised", session.session_id);
                session.streaming_live = true;
            }
            Err(e) => {
                log::warn!(
                    "assess: init failed for session {} ({e}), continuing in accumulate-only mode",
                    session.session_id
                );
            }
        }
        session.state = SessionState::Active;
        session
    }

    /// Feed one recorded audio chunk.
    ///
    /// Always accumulates locally; additionally forwards to the server
    /// when the session has a live init.  Forwarding failures never abort
    /// the session.
    pub async fn feed_chunk(&mut self, chunk: &[u8]) {
        let index = self.chunk_index;
        self.accumulated.push(chunk.to_vec());
        self.chunk_index += 1;

        if self.streaming_live && self.state == SessionState::Active {
            if let Err(e) = self.client.send_chunk(&self.session_id, chunk, index).await {
                log::warn!("assess: chunk {index} upload failed ({e}), keeping local copy");
            }
        }
    }

    /// Finish the session and produce the score.
    ///
    /// Tries `finalize` first (when init succeeded); a transport failure
    /// or a payload without recognisable scores triggers exactly one batch
    /// request built from the accumulated chunks in index order.
    pub async fn stop(mut self) -> Result<AssessmentResult, AssessmentError> {
        if self.accumulated.is_empty() {
            self.state = SessionState::Closed;
            return Err(AssessmentError::InsufficientAudio);
        }
        self.state = SessionState::Finalizing;

        if self.streaming_live {
            match self.client.finalize(&self.session_id).await {
                Ok(payload) => {
                    if let Some(result) = AssessmentResult::from_payload(&payload) {
                        log::debug!("assess: session {} finalised", self.session_id);
                        self.state = SessionState::Closed;
                        return Ok(result);
                    }
                    log::warn!(
                        "assess: finalize for session {} returned no usable scores, \
                         falling back to batch",
                        self.session_id
                    );
                }
                Err(e) => {
                    log::warn!(
                        "assess: finalize failed for session {} ({e}), falling back to batch",
                        self.session_id
                    );
                }
            }
        }

        let result = self.batch_fallback().await;
        self.state = SessionState::Closed;
        result
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn chunks_fed(&self) -> usize {
        self.chunk_index
    }

    async fn batch_fallback(&self) -> Result<AssessmentResult, AssessmentError> {
        let combined: Vec<u8> = self.accumulated.concat();
        log::debug!(
            "assess: batch fallback for session {} ({} chunks, {} bytes)",
            self.session_id,
            self.accumulated.len(),
            combined.len()
        );

        let payload = self
            .client
            .assess_batch(&self.reference_text, &combined, self.strict_mode)
            .await
            .map_err(|e| AssessmentError::Unavailable(e.to_string()))?;

        AssessmentResult::from_payload(&payload).ok_or_else(|| {
            AssessmentError::Unavailable("batch scoring returned no usable scores".into())
        })
    }
}

/// Time+random composite: unique even across sessions begun in the same
/// millisecond.
fn new_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{millis}-{}", Uuid::new_v4())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
