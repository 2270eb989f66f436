//! Stream transport adapters: true-incremental playback and the buffered
//! fallback.
//!
//! # End-of-stream heuristic
//!
//! The synthesis transport does not reliably signal logical end-of-stream
//! in every deployment, so both adapters treat a read that stays idle for
//! the configured window as complete (0.8 s on the streaming path, 0.5 s
//! on the buffered path by default).  A hard `max_total` bound caps the
//! whole read so a stalled-but-open connection cannot hang a session.
//!
//! # Append serialization
//!
//! The media-buffer append primitive is not reentrant.  The true-stream
//! adapter therefore never appends from the read loop: chunks go into an
//! mpsc queue drained by a single consumer task that awaits each append's
//! completion before issuing the next.  Concurrent appends are impossible
//! by construction.
//!
//! # Fallback contract
//!
//! When the true-stream adapter fails — sink open, append, or read — it
//! silences the media sink, then unwinds into a [`StreamFallbackState`]
//! carrying every byte read so far plus the still-open chunk source.  The
//! buffered adapter resumes from there; nothing is re-fetched from byte
//! zero, and the failed sink cannot play over the fallback.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use crate::config::StreamConfig;
use crate::playback::{
    ActiveAudio, AudioBlob, AudioOutput, MediaBuffer, MediaStore, MediaUrl, PlaybackError,
    PlaybackSource,
};

use super::client::{SynthesisStream, TransportError};

// ---------------------------------------------------------------------------
// StreamTuning
// ---------------------------------------------------------------------------

/// Resolved streaming tunables (durations instead of raw config integers).
#[derive(Debug, Clone)]
pub(crate) struct StreamTuning {
    pub stream_idle: Duration,
    pub buffered_idle: Duration,
    pub min_start_bytes: usize,
    pub max_total: Duration,
}

impl From<&StreamConfig> for StreamTuning {
    fn from(cfg: &StreamConfig) -> Self {
        Self {
            stream_idle: Duration::from_millis(cfg.stream_idle_timeout_ms),
            buffered_idle: Duration::from_millis(cfg.buffered_idle_timeout_ms),
            min_start_bytes: cfg.min_start_bytes,
            max_total: Duration::from_secs(cfg.max_stream_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// AdapterError
// ---------------------------------------------------------------------------

/// Failure of the buffered (terminal-fallback) adapter.
#[derive(Debug, Error)]
pub(crate) enum AdapterError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("stream produced no audio bytes")]
    Empty,
}

// ---------------------------------------------------------------------------
// Adapter results
// ---------------------------------------------------------------------------

/// Successful true-stream playback: audio is already audible, and the
/// complete byte accumulation is ready for the cache tiers.
pub(crate) struct StreamPlayback {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub active: Arc<dyn ActiveAudio>,
}

/// Unwound true-stream attempt.  Carries everything the buffered adapter
/// needs to continue mid-stream.
pub(crate) struct StreamFallbackState {
    pub bytes_so_far: Vec<u8>,
    pub stream: SynthesisStream,
    pub reason: String,
}

/// Successful buffered playback.
pub(crate) struct BufferedPlayback {
    pub blob: Arc<AudioBlob>,
    pub media_url: MediaUrl,
    pub active: Arc<dyn ActiveAudio>,
}

// ---------------------------------------------------------------------------
// Shared read step
// ---------------------------------------------------------------------------

enum ReadStep {
    Chunk(Bytes),
    /// Clean close, idle window elapsed, or hard cap reached.
    Finished,
    Failed(TransportError),
}

/// One bounded read from the chunk source.
async fn read_step(
    stream: &mut SynthesisStream,
    idle: Duration,
    deadline: Instant,
) -> ReadStep {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        log::warn!("synth: max stream duration reached, treating stream as complete");
        return ReadStep::Finished;
    }

    match timeout(idle.min(remaining), stream.chunks.next_chunk()).await {
        Ok(Ok(Some(chunk))) => ReadStep::Chunk(chunk),
        Ok(Ok(None)) => ReadStep::Finished,
        Ok(Err(e)) => ReadStep::Failed(e),
        Err(_elapsed) => {
            log::debug!("synth: idle window elapsed, treating stream as complete");
            ReadStep::Finished
        }
    }
}

// ---------------------------------------------------------------------------
// True-stream adapter
// ---------------------------------------------------------------------------

/// Incremental playback: append chunks while they arrive, start audio as
/// soon as `min_start_bytes` have accumulated.
///
/// Never retries its own strategy.  Every failure mode returns
/// `Err(StreamFallbackState)` so the orchestrator degrades to the buffered
/// adapter with the bytes collected so far.  Any sound the sink already
/// produced is stopped before unwinding, so the fallback playback never
/// overlaps it.
pub(crate) async fn run_true_stream(
    output: &dyn AudioOutput,
    mut stream: SynthesisStream,
    tuning: &StreamTuning,
) -> Result<StreamPlayback, StreamFallbackState> {
    let mime = stream.mime.clone();

    let buffer = match output.open_media_buffer(&mime).await {
        Ok(buffer) => buffer,
        Err(e) => {
            return Err(StreamFallbackState {
                bytes_so_far: Vec::new(),
                stream,
                reason: e.to_string(),
            });
        }
    };

    // Single-consumer append queue: the drainer owns the media buffer and
    // awaits each append before the next, so appends are never concurrent.
    // The buffer is handed back even on failure — the sink may already be
    // audible and the unwind path must be able to silence it.
    let (tx, mut rx) = mpsc::channel::<Bytes>(16);
    let min_start_bytes = tuning.min_start_bytes;
    let drainer = tokio::spawn(async move {
        let mut buffer: Box<dyn MediaBuffer> = buffer;
        let mut appended = 0usize;
        let mut playing = false;
        while let Some(chunk) = rx.recv().await {
            appended += chunk.len();
            if let Err(e) = buffer.append(chunk).await {
                return Err((buffer, e));
            }
            if !playing && appended >= min_start_bytes {
                if let Err(e) = buffer.begin_playback().await {
                    return Err((buffer, e));
                }
                playing = true;
            }
        }
        // Short streams may finish below the start threshold.
        if !playing {
            if let Err(e) = buffer.begin_playback().await {
                return Err((buffer, e));
            }
        }
        if let Err(e) = buffer.end_of_stream().await {
            return Err((buffer, e));
        }
        Ok(buffer)
    });

    let deadline = Instant::now() + tuning.max_total;
    let mut collected: Vec<u8> = Vec::new();
    let mut read_failure: Option<TransportError> = None;

    loop {
        match read_step(&mut stream, tuning.stream_idle, deadline).await {
            ReadStep::Chunk(chunk) => {
                collected.extend_from_slice(&chunk);
                if tx.send(chunk).await.is_err() {
                    // Drainer hit an append error; its result tells us below.
                    break;
                }
            }
            ReadStep::Finished => break,
            ReadStep::Failed(e) => {
                read_failure = Some(e);
                break;
            }
        }
    }
    drop(tx);

    let (buffer, drain_failure) = match drainer.await {
        Ok(Ok(buffer)) => (buffer, None),
        Ok(Err((buffer, e))) => (buffer, Some(e.to_string())),
        Err(join_err) => {
            return Err(StreamFallbackState {
                bytes_so_far: collected,
                stream,
                reason: join_err.to_string(),
            });
        }
    };

    let failure = read_failure
        .map(|e| e.to_string())
        .or(drain_failure)
        .or_else(|| {
            collected
                .is_empty()
                .then(|| "stream closed without audio bytes".to_string())
        });

    if let Some(reason) = failure {
        // The sink may already be playing what was appended; silence it
        // before the caller starts the buffered fallback, or two playbacks
        // would be audible at once.
        buffer.into_active().stop();
        return Err(StreamFallbackState {
            bytes_so_far: collected,
            stream,
            reason,
        });
    }

    log::debug!(
        "synth: true-stream complete, {} bytes of {mime}",
        collected.len()
    );
    Ok(StreamPlayback {
        bytes: collected,
        mime,
        active: buffer.into_active(),
    })
}

// ---------------------------------------------------------------------------
// Buffered adapter
// ---------------------------------------------------------------------------

/// Collect-then-play: read the remaining stream to completion, assemble one
/// blob, register it locally and play it.
///
/// `bytes_so_far` carries whatever a failed true-stream attempt already
/// read; the combined accumulation is what gets played and cached.  This
/// path fails only on total transport failure or an empty result — never
/// on format.
pub(crate) async fn run_buffered(
    output: &dyn AudioOutput,
    store: &MediaStore,
    mut bytes_so_far: Vec<u8>,
    mut stream: SynthesisStream,
    tuning: &StreamTuning,
) -> Result<BufferedPlayback, AdapterError> {
    let deadline = Instant::now() + tuning.max_total;

    loop {
        match read_step(&mut stream, tuning.buffered_idle, deadline).await {
            ReadStep::Chunk(chunk) => bytes_so_far.extend_from_slice(&chunk),
            ReadStep::Finished => break,
            ReadStep::Failed(e) => return Err(e.into()),
        }
    }

    if bytes_so_far.is_empty() {
        return Err(AdapterError::Empty);
    }

    let blob = Arc::new(AudioBlob::new(bytes_so_far, stream.mime.clone()));
    let media_url = store.register(Arc::clone(&blob));
    let active = output.play(PlaybackSource::Blob(Arc::clone(&blob))).await?;

    log::debug!("synth: buffered playback of {} bytes", blob.len());
    Ok(BufferedPlayback {
        blob,
        media_url,
        active,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
