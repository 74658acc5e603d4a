//! Remote speech synthesis client
//!
//! Turns arbitrary-length text into PCM audio by splitting it at
//! linguistic boundaries, calling the synthesis endpoint with bounded
//! retry, and decoding the streamed response incrementally.

pub mod chunker;
pub mod client;

pub use chunker::chunk_text;
pub use client::{SpeechClient, SpeechClientConfig, SynthesisError};
