//! Core `SpeechSynthesizer` trait and the `OpenAiSynthesizer` implementation.
//!
//! `OpenAiSynthesizer` calls any OpenAI-compatible `/v1/audio/speech`
//! endpoint. All connection details come from [`TtsConfig`]; nothing is
//! hardcoded. One call is one request: retry policy does not live here.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;

use crate::config::TtsConfig;
use crate::tts::voice::Voice;

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Errors that can occur while synthesizing one segment.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// HTTP transport or connection error before a response arrived.
    #[error("speech request failed: {0}")]
    Request(String),

    /// The request exceeded the configured client timeout.
    #[error("speech request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The audio body failed part-way through.
    #[error("audio stream interrupted: {0}")]
    Stream(String),

    /// The segments handed to the fetcher were not numbered `0..n`.
    #[error("invalid segment list: {0}")]
    InvalidSegments(String),

    /// The task driving the request panicked or was aborted.
    #[error("synthesis task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

/// Body-read failures: timeouts stay [`SynthesisError::Timeout`], anything
/// else means the stream broke.
fn body_error(e: reqwest::Error) -> SynthesisError {
    match SynthesisError::from(e) {
        SynthesisError::Request(msg) => SynthesisError::Stream(msg),
        other => other,
    }
}

/// Audio bytes as they arrive from the service.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes, SynthesisError>> + Send>>;

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Async trait for text-to-speech backends.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// behind an `Arc<dyn SpeechSynthesizer>`.
///
/// The returned future resolves once the response headers are in; the body
/// is read incrementally from the [`AudioStream`].
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<AudioStream, SynthesisError>;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// JSON body of `POST /v1/audio/speech`.
#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: Voice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// OpenAiSynthesizer
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint.
///
/// The `reqwest::Client` inside is cheap to clone and reuses connections,
/// so one instance should serve every segment of a run.
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl OpenAiSynthesizer {
    /// Build a synthesizer from application config.
    ///
    /// A timeout is applied only when `config.request_timeout_secs` is set.
    pub fn from_config(config: &TtsConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/speech", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, text: &'a str, voice: Voice) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.config.model,
            input: text,
            voice,
            response_format: self.config.response_format.as_deref(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<AudioStream, SynthesisError> {
        let mut req = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(text, voice));

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        log::debug!("tts: requesting speech for {} chars", text.chars().count());
        let started = std::time::Instant::now();
        let response = req.send().await?;
        log::debug!("tts: headers after {:?}", started.elapsed());

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(body_error));
        Ok(Box::pin(stream))
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer (test double)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{MockReply, MockSynthesizer};


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
