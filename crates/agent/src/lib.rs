//! Session bridge for voice and text interactions
//!
//! Owns the per-session state machine, serializes text interactions
//! through a FIFO queue, runs audio captures as a single cancellable
//! background execution, and translates pipeline output into wire frames.

pub mod bridge;
pub mod queue;
pub mod transcript;

pub use bridge::{BridgeConfig, SessionBridge, SessionState};
pub use queue::TaskQueue;
pub use transcript::TranscriptBuffer;

use thiserror::Error;

/// Bridge errors
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Session closed")]
    Closed,

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}
