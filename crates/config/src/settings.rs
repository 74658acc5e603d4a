//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Audio rates and buffering
    #[serde(default)]
    pub audio: AudioConfig,

    /// Speech synthesis endpoint
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Session behavior
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from an optional file plus environment overrides.
    ///
    /// Environment variables use the `VOICE_BRIDGE` prefix with `__` as the
    /// section separator, e.g. `VOICE_BRIDGE__SERVER__PORT=9000`.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix("VOICE_BRIDGE").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.pipeline_sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audio.pipeline_sample_rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }

        if self.audio.input_sample_rate < self.audio.pipeline_sample_rate {
            return Err(ConfigError::InvalidValue {
                field: "audio.input_sample_rate".to_string(),
                message: format!(
                    "must be at least the pipeline rate ({} Hz)",
                    self.audio.pipeline_sample_rate
                ),
            });
        }

        if self.audio.input_sample_rate % self.audio.pipeline_sample_rate != 0 {
            // Decimation rounds to the nearest integer stride; warn, don't fail.
            tracing::warn!(
                input = self.audio.input_sample_rate,
                pipeline = self.audio.pipeline_sample_rate,
                "Input rate is not an integer multiple of the pipeline rate; \
                 decimation will round the stride"
            );
        }

        if self.synthesis.chunk_budget == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synthesis.chunk_budget".to_string(),
                message: "must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Enable permissive CORS (dashboard dev servers)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
            cors_enabled: true,
        }
    }
}

/// Audio rates and buffering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Rate the client captures at (Hz)
    #[serde(default = "default_input_rate")]
    pub input_sample_rate: u32,

    /// Rate the pipeline consumes at (Hz)
    #[serde(default = "default_pipeline_rate")]
    pub pipeline_sample_rate: u32,

    /// Rate of TTS audio sent to the client (Hz)
    #[serde(default = "default_tts_rate")]
    pub tts_sample_rate: u32,

    /// Capacity of the capture queue, in frames
    #[serde(default = "default_queue_frames")]
    pub queue_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: default_input_rate(),
            pipeline_sample_rate: default_pipeline_rate(),
            tts_sample_rate: default_tts_rate(),
            queue_frames: default_queue_frames(),
        }
    }
}

/// Speech synthesis endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Base URL of the synthesis service
    #[serde(default = "default_synthesis_endpoint")]
    pub endpoint: String,

    /// API key, if the endpoint requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Voice identifier
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Per-request character budget
    #[serde(default = "default_chunk_budget")]
    pub chunk_budget: usize,

    /// Retries after the first attempt (429/5xx only)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds; doubles per attempt
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Synthesize final responses directly when the pipeline yields no audio
    #[serde(default)]
    pub speak_final_text: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_synthesis_endpoint(),
            api_key: None,
            voice: default_voice(),
            chunk_budget: default_chunk_budget(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            speak_final_text: false,
        }
    }
}

/// Session behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Agent persona handed to the pipeline on session open
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Flagged but unenforced: the bridge does not time out pipeline
    /// executions; a stalled engine holds the session in processing.
    #[serde(default)]
    pub execution_timeout_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            execution_timeout_secs: None,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub log_json: bool,

    /// Expose Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_sessions() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_input_rate() -> u32 {
    48000
}

fn default_pipeline_rate() -> u32 {
    16000
}

fn default_tts_rate() -> u32 {
    24000
}

fn default_queue_frames() -> usize {
    64
}

fn default_synthesis_endpoint() -> String {
    "http://localhost:8880/v1/audio/speech".to_string()
}

fn default_voice() -> String {
    "narrator".to_string()
}

fn default_chunk_budget() -> usize {
    280
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_persona() -> String {
    "You are the workspace's document assistant. Answer from the user's \
     documents, cite what you open, and keep spoken replies short."
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.audio.input_sample_rate, 48000);
        assert_eq!(settings.audio.pipeline_sample_rate, 16000);
        assert_eq!(settings.synthesis.max_retries, 3);
    }

    #[test]
    fn test_rejects_zero_pipeline_rate() {
        let mut settings = Settings::default();
        settings.audio.pipeline_sample_rate = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_input_below_pipeline_rate() {
        let mut settings = Settings::default();
        settings.audio.input_sample_rate = 8000;
        assert!(settings.validate().is_err());
    }
}
