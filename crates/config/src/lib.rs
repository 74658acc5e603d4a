//! Configuration for the voice session bridge
//!
//! Settings are layered: built-in defaults, then an optional config file,
//! then `VOICE_BRIDGE__*` environment overrides.

mod settings;

pub use settings::{
    AudioConfig, ObservabilityConfig, ServerConfig, SessionConfig, Settings, SynthesisConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
