//! Synthesis endpoint client
//!
//! One request per text chunk, with bounded exponential backoff on
//! retryable statuses. The streaming variant decodes newline-delimited
//! JSON records incrementally, buffering partial lines across reads.

use std::pin::Pin;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunker::chunk_text;

/// Synthesis client errors
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Synthesis endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Synthesis retries exhausted after {attempts} attempts; last status {status}: {body}")]
    RetriesExhausted {
        attempts: u32,
        status: u16,
        body: String,
    },

    #[error("Malformed synthesis stream record: {0}")]
    Decode(String),
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct SpeechClientConfig {
    /// Synthesis endpoint URL
    pub endpoint: String,
    /// Bearer token, if required
    pub api_key: Option<String>,
    /// Voice identifier
    pub voice: String,
    /// Requested output sample rate (Hz)
    pub sample_rate: u32,
    /// Per-request character budget
    pub chunk_budget: usize,
    /// Retries after the first attempt, for 429/5xx only
    pub max_retries: u32,
    /// Base backoff delay; doubles per attempt
    pub retry_base_delay: Duration,
}

impl Default for SpeechClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8880/v1/audio/speech".to_string(),
            api_key: None,
            voice: "narrator".to_string(),
            sample_rate: 24000,
            chunk_budget: 280,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    input: &'a str,
    voice: &'a str,
    sample_rate: u32,
    stream: bool,
}

/// One newline-delimited record of the streaming response
#[derive(Debug, Deserialize)]
struct StreamRecord {
    /// Base64-encoded 16-bit LE PCM
    audio: String,
}

/// Speech synthesis client
#[derive(Debug, Clone)]
pub struct SpeechClient {
    http: reqwest::Client,
    config: SpeechClientConfig,
}

impl SpeechClient {
    /// Create a client
    pub fn new(config: SpeechClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Client configuration
    pub fn config(&self) -> &SpeechClientConfig {
        &self.config
    }

    /// Synthesize `text` into one PCM buffer.
    ///
    /// Text beyond the per-request budget is split into ordered chunks and
    /// the decoded audio concatenated in order.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<i16>, SynthesisError> {
        let mut pcm = Vec::new();

        for chunk in chunk_text(text, self.config.chunk_budget) {
            if chunk.trim().is_empty() {
                continue;
            }
            let response = self.request_with_retry(&chunk, false).await?;
            let body = response.bytes().await?;
            pcm.extend(pcm16_from_bytes(&body));
        }

        Ok(pcm)
    }

    /// Synthesize `text`, yielding PCM chunks as the endpoint produces
    /// them. Each decoded record becomes one item, in arrival order.
    pub fn synthesize_stream(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Stream<Item = Result<Vec<i16>, SynthesisError>> + Send>> {
        let client = self.clone();
        let chunks = chunk_text(text, self.config.chunk_budget);

        Box::pin(async_stream::try_stream! {
            for chunk in chunks {
                if chunk.trim().is_empty() {
                    continue;
                }

                let response = client.request_with_retry(&chunk, true).await?;
                let mut lines = LineBuffer::default();
                let mut body = response.bytes_stream();

                while let Some(data) = body.next().await {
                    for line in lines.push(&data?) {
                        yield decode_record(&line)?;
                    }
                }

                // A final record may arrive without a trailing newline
                if let Some(line) = lines.finish() {
                    yield decode_record(&line)?;
                }
            }
        })
    }

    async fn request_with_retry(
        &self,
        text: &str,
        stream: bool,
    ) -> Result<reqwest::Response, SynthesisError> {
        let mut attempt: u32 = 0;

        loop {
            let mut request = self.http.post(&self.config.endpoint).json(&SynthesisRequest {
                input: text,
                voice: &self.config.voice,
                sample_rate: self.config.sample_rate,
                stream,
            });
            if let Some(key) = &self.config.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if !is_retryable(status) {
                return Err(SynthesisError::Endpoint {
                    status: status.as_u16(),
                    body,
                });
            }

            if attempt >= self.config.max_retries {
                return Err(SynthesisError::RetriesExhausted {
                    attempts: attempt + 1,
                    status: status.as_u16(),
                    body,
                });
            }

            let delay = self.config.retry_base_delay * 2u32.saturating_pow(attempt);
            tracing::warn!(
                status = status.as_u16(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Synthesis request failed; backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// 429 and 5xx are transient; everything else is terminal
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn decode_record(line: &[u8]) -> Result<Vec<i16>, SynthesisError> {
    let record: StreamRecord =
        serde_json::from_slice(line).map_err(|e| SynthesisError::Decode(e.to_string()))?;
    let raw = BASE64
        .decode(record.audio.as_bytes())
        .map_err(|e| SynthesisError::Decode(e.to_string()))?;
    Ok(pcm16_from_bytes(&raw))
}

fn pcm16_from_bytes(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Accumulates bytes and hands back completed newline-delimited records.
///
/// A read may end mid-record; the partial tail stays buffered until the
/// next read or `finish`.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}
