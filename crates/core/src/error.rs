//! Shared error type

use thiserror::Error;

/// Errors shared across the bridge crates
#[derive(Debug, Error)]
pub enum Error {
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
