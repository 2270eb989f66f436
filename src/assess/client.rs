//! Assessment service client trait and HTTP implementation.
//!
//! Four collaborator endpoints behind one trait:
//!
//! - `POST {base}/assessment/init`     — open a streaming scoring session.
//! - `POST {base}/assessment/chunk`    — upload one base64 audio chunk.
//! - `POST {base}/assessment/finalize` — close the session, get the score.
//! - `POST {base}/assessment`          — legacy batch scoring of one blob.
//!
//! Audio bytes travel base64-encoded inside JSON bodies on every path.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::config::AssessmentConfig;
use crate::synth::TransportError;

// ---------------------------------------------------------------------------
// AssessmentClient trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the assessment service.
///
/// `finalize` and `assess_batch` return raw payloads; shape validation
/// (and the fallback decision it drives) belongs to the session layer.
#[async_trait]
pub trait AssessmentClient: Send + Sync {
    /// Open a streaming session on the server.
    async fn init(
        &self,
        session_id: &str,
        reference_text: &str,
        strict_mode: bool,
    ) -> Result<(), TransportError>;

    /// Upload one audio chunk for an open session.
    async fn send_chunk(
        &self,
        session_id: &str,
        chunk: &[u8],
        chunk_index: usize,
    ) -> Result<(), TransportError>;

    /// Close the session and request the final score payload.
    async fn finalize(&self, session_id: &str) -> Result<Value, TransportError>;

    /// Legacy batch scoring of one complete recording.
    async fn assess_batch(
        &self,
        reference_text: &str,
        audio: &[u8],
        strict_mode: bool,
    ) -> Result<Value, TransportError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AssessmentClient>) {}
};

// ---------------------------------------------------------------------------
// HttpAssessmentClient
// ---------------------------------------------------------------------------

/// Production client backed by `reqwest`.
pub struct HttpAssessmentClient {
    client: reqwest::Client,
    config: AssessmentConfig,
}

impl HttpAssessmentClient {
    /// Build a client from config.
    pub fn from_config(config: &AssessmentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        let url = format!("{}{path}", self.config.base_url);
        let mut req = self.client.post(&url).json(&body);
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?.error_for_status()?;
        response
            .json()
            .await
            .map_err(|e| TransportError::Response(e.to_string()))
    }
}

#[async_trait]
impl AssessmentClient for HttpAssessmentClient {
    async fn init(
        &self,
        session_id: &str,
        reference_text: &str,
        strict_mode: bool,
    ) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "sessionId": session_id,
            "referenceText": reference_text,
            "strictMode": strict_mode,
            "options": {},
        });
        self.post_json("/assessment/init", body).await.map(|_| ())
    }

    async fn send_chunk(
        &self,
        session_id: &str,
        chunk: &[u8],
        chunk_index: usize,
    ) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "sessionId": session_id,
            "audioChunk": BASE64.encode(chunk),
            "chunkIndex": chunk_index,
        });
        self.post_json("/assessment/chunk", body).await.map(|_| ())
    }

    async fn finalize(&self, session_id: &str) -> Result<Value, TransportError> {
        let body = serde_json::json!({
            "sessionId": session_id,
            "options": {},
        });
        self.post_json("/assessment/finalize", body).await
    }

    async fn assess_batch(
        &self,
        reference_text: &str,
        audio: &[u8],
        strict_mode: bool,
    ) -> Result<Value, TransportError> {
        let body = serde_json::json!({
            "referenceText": reference_text,
            "audioBuffer": BASE64.encode(audio),
            "strictMode": strict_mode,
        });
        self.post_json("/assessment", body).await
    }
}

// ---------------------------------------------------------------------------
// Mocks  (test-only)
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
