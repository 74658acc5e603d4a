//! Inbound audio buffering and resampling
//!
//! Sits between the socket reader and the pipeline consumer: chunks are
//! pushed in arrival order, decimated to the pipeline rate, and drained
//! as a lazy, finite, single-consumer stream with an explicit end signal.

mod manager;
mod resample;

pub use manager::AudioStreamManager;
pub use resample::{decimate, decimation_stride};

use thiserror::Error;

/// Audio manager errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio sequence already ended")]
    Ended,

    #[error("Stream already taken; the sequence is single-consumer")]
    StreamTaken,

    #[error("Capture queue closed by the consumer")]
    ConsumerGone,
}
