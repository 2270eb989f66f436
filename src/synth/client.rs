//! Synthesis service client trait and HTTP implementation.
//!
//! Two collaborator endpoints, consumed through one trait:
//!
//! - `POST {base}/synthesize/stream` — returns raw audio bytes as an
//!   incremental stream, with `content-type` naming the codec and an
//!   optional `x-audio-url` header carrying a durable reference for the
//!   persistent cache.
//! - `POST {base}/synthesize` — legacy non-streaming endpoint returning
//!   `{ success, audioUrl, size?, type? }`.
//!
//! All connection details come from [`SynthesisConfig`]; nothing is
//! hardcoded.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SynthesisConfig;

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Network-level failures talking to a remote service.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The response could not be parsed or had an unexpected shape.
    #[error("unexpected response: {0}")]
    Response(String),

    /// A byte-stream read failed mid-stream.
    #[error("stream read failed: {0}")]
    Read(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AudioChunkStream / SynthesisStream
// ---------------------------------------------------------------------------

/// Ordered source of audio byte chunks.
///
/// `Ok(None)` means the transport signalled a clean close.  Many
/// deployments never do — the adapters layer an idle-timeout heuristic on
/// top of this interface to decide that a silent stream is finished.
#[async_trait]
pub trait AudioChunkStream: Send {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError>;
}

/// An open synthesis byte stream plus its negotiated metadata.
pub struct SynthesisStream {
    /// MIME type of the audio, from the `content-type` header.
    pub mime: String,
    /// Durable reference from `x-audio-url`, usable by the persistent cache.
    pub durable_url: Option<String>,
    /// The chunk source.
    pub chunks: Box<dyn AudioChunkStream>,
}

// ---------------------------------------------------------------------------
// SynthesizedAudio  (legacy endpoint response)
// ---------------------------------------------------------------------------

/// Response of the non-streaming synthesis endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedAudio {
    pub success: bool,
    pub audio_url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub mime: Option<String>,
}

// ---------------------------------------------------------------------------
// SynthesisClient trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the synthesis service.
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    /// Open an incremental byte stream for `(text, voice, rate)`.
    async fn open_stream(
        &self,
        text: &str,
        voice: &str,
        rate: f32,
    ) -> Result<SynthesisStream, TransportError>;

    /// Legacy one-shot synthesis returning a hosted audio URL.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        rate: f32,
    ) -> Result<SynthesizedAudio, TransportError>;
}

// ---------------------------------------------------------------------------
// HttpSynthesisClient
// ---------------------------------------------------------------------------

/// Production client backed by `reqwest`.
///
/// Two inner clients: one with the configured per-request timeout for the
/// non-streaming endpoint, and one without any overall deadline for the
/// streaming endpoint — streaming reads are paced by the adapters'
/// idle-timeout and max-duration logic, not a single request deadline.
pub struct HttpSynthesisClient {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    config: SynthesisConfig,
}

impl HttpSynthesisClient {
    /// Build a client from config.
    pub fn from_config(config: &SynthesisConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            stream_client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    fn request(
        &self,
        client: &reqwest::Client,
        url: &str,
        body: serde_json::Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(&body);
        // Attach Authorization header only when api_key is a non-empty string.
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }
        req
    }
}

struct HttpChunkStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
}

#[async_trait]
impl AudioChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.inner.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(TransportError::Read(e.to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SynthesisClient for HttpSynthesisClient {
    async fn open_stream(
        &self,
        text: &str,
        voice: &str,
        rate: f32,
    ) -> Result<SynthesisStream, TransportError> {
        let url = format!("{}/synthesize/stream", self.config.base_url);
        let body = serde_json::json!({ "text": text, "voice": voice, "rate": rate });

        let response = self
            .request(&self.stream_client, &url, body)
            .send()
            .await?
            .error_for_status()?;

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let durable_url = response
            .headers()
            .get("x-audio-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(SynthesisStream {
            mime,
            durable_url,
            chunks: Box::new(HttpChunkStream {
                inner: response.bytes_stream().boxed(),
            }),
        })
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        rate: f32,
    ) -> Result<SynthesizedAudio, TransportError> {
        let url = format!("{}/synthesize", self.config.base_url);
        let body = serde_json::json!({ "text": text, "voice": voice, "rate": rate });

        let response = self
            .request(&self.client, &url, body)
            .send()
            .await?
            .error_for_status()?;
        let audio: SynthesizedAudio = response
            .json()
            .await
            .map_err(|e| TransportError::Response(e.to_string()))?;

        if !audio.success {
            return Err(TransportError::Response(
                "synthesis endpoint reported failure".into(),
            ));
        }
        Ok(audio)
    }
}

// ---------------------------------------------------------------------------
// Mocks  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Chunk source backed by a fixed list, with optional fault injection.
    pub struct ScriptedChunkStream {
        chunks: VecDeque<Bytes>,
        served: usize,
        /// Error instead of serving the chunk at this index.
        error_at: Option<usize>,
        /// If set, never signal a clean close — hang after the last chunk
        /// (models transports with no reliable end-of-stream).
        hang_at_end: bool,
    }

    #[async_trait]
    impl AudioChunkStream for ScriptedChunkStream {
        async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
            if self.error_at == Some(self.served) {
                return Err(TransportError::Read("injected read failure".into()));
            }
            match self.chunks.pop_front() {
                Some(chunk) => {
                    self.served += 1;
                    Ok(Some(chunk))
                }
                None if self.hang_at_end => futures_util::future::pending().await,
                None => Ok(None),
            }
        }
    }

    /// Scriptable [`SynthesisClient`] with call counters.
    pub struct MockSynthesisClient {
        chunks: Vec<Bytes>,
        mime: String,
        durable_url: Option<String>,
        fail_open_stream: bool,
        /// Fail `open_stream` once this many opens have succeeded.
        open_limit: Option<usize>,
        error_at: Option<usize>,
        hang_at_end: bool,
        legacy: Option<SynthesizedAudio>,
        pub stream_opens: AtomicUsize,
        pub legacy_calls: AtomicUsize,
    }

    impl MockSynthesisClient {
        pub fn streaming(chunks: Vec<&[u8]>) -> Self {
            Self {
                chunks: chunks.into_iter().map(Bytes::copy_from_slice).collect(),
                mime: "audio/mpeg".into(),
                durable_url: None,
                fail_open_stream: false,
                open_limit: None,
                error_at: None,
                hang_at_end: false,
                legacy: None,
                stream_opens: AtomicUsize::new(0),
                legacy_calls: AtomicUsize::new(0),
            }
        }

        pub fn with_durable_url(mut self, url: &str) -> Self {
            self.durable_url = Some(url.into());
            self
        }

        pub fn with_read_error_at(mut self, index: usize) -> Self {
            self.error_at = Some(index);
            self
        }

        pub fn with_hanging_end(mut self) -> Self {
            self.hang_at_end = true;
            self
        }

        pub fn with_failing_stream(mut self) -> Self {
            self.fail_open_stream = true;
            self
        }

        /// Serve `n` streams, then fail every further `open_stream`.
        pub fn with_stream_opens_limit(mut self, n: usize) -> Self {
            self.open_limit = Some(n);
            self
        }

        pub fn with_legacy_url(mut self, url: &str) -> Self {
            self.legacy = Some(SynthesizedAudio {
                success: true,
                audio_url: url.into(),
                size: None,
                mime: Some("audio/mpeg".into()),
            });
            self
        }
    }

    #[async_trait]
    impl SynthesisClient for MockSynthesisClient {
        async fn open_stream(
            &self,
            _text: &str,
            _voice: &str,
            _rate: f32,
        ) -> Result<SynthesisStream, TransportError> {
            let opens = self.stream_opens.fetch_add(1, Ordering::SeqCst);
            if self.fail_open_stream || self.open_limit.is_some_and(|n| opens >= n) {
                return Err(TransportError::Request("injected open failure".into()));
            }
            Ok(SynthesisStream {
                mime: self.mime.clone(),
                durable_url: self.durable_url.clone(),
                chunks: Box::new(ScriptedChunkStream {
                    chunks: self.chunks.iter().cloned().collect(),
                    served: 0,
                    error_at: self.error_at,
                    hang_at_end: self.hang_at_end,
                }),
            })
        }

        async fn synthesize(
            &self,
            _text: &str,
            _voice: &str,
            _rate: f32,
        ) -> Result<SynthesizedAudio, TransportError> {
            self.legacy_calls.fetch_add(1, Ordering::SeqCst);
            self.legacy
                .clone()
                .ok_or_else(|| TransportError::Request("injected legacy failure".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    #[test]
    fn from_config_builds_without_panic() {
        let _client = HttpSynthesisClient::from_config(&SynthesisConfig::default());
    }

    #[test]
    fn legacy_response_deserializes_camel_case() {
        let json = r#"{ "success": true, "audioUrl": "https://a/b.mp3", "size": 123, "type": "audio/mpeg" }"#;
        let audio: SynthesizedAudio = serde_json::from_str(json).expect("parse");
        assert!(audio.success);
        assert_eq!(audio.audio_url, "https://a/b.mp3");
        assert_eq!(audio.size, Some(123));
        assert_eq!(audio.mime.as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn legacy_response_optional_fields_default() {
        let json = r#"{ "success": false, "audioUrl": "" }"#;
        let audio: SynthesizedAudio = serde_json::from_str(json).expect("parse");
        assert!(!audio.success);
        assert!(audio.size.is_none());
    }

    #[tokio::test]
    async fn scripted_stream_serves_in_order_then_closes() {
        let client = MockSynthesisClient::streaming(vec![b"ab", b"cd"]);
        let mut stream = client.open_stream("hi", "Nova", 1.0).await.expect("open");

        assert_eq!(
            stream.chunks.next_chunk().await.expect("chunk"),
            Some(Bytes::from_static(b"ab"))
        );
        assert_eq!(
            stream.chunks.next_chunk().await.expect("chunk"),
            Some(Bytes::from_static(b"cd"))
        );
        assert_eq!(stream.chunks.next_chunk().await.expect("close"), None);
    }

    #[tokio::test]
    async fn scripted_stream_injects_read_error() {
        let client = MockSynthesisClient::streaming(vec![b"ab", b"cd"]).with_read_error_at(1);
        let mut stream = client.open_stream("hi", "Nova", 1.0).await.expect("open");

        assert!(stream.chunks.next_chunk().await.is_ok());
        assert!(matches!(
            stream.chunks.next_chunk().await,
            Err(TransportError::Read(_))
        ));
    }
}
