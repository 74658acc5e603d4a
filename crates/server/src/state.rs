//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use voice_bridge_config::Settings;
use voice_bridge_core::ConversationPipeline;
use voice_bridge_tools::ToolGateway;
use voice_bridge_tts::{SpeechClient, SpeechClientConfig};

use crate::registry::SessionRegistry;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Live sessions
    pub registry: Arc<SessionRegistry>,
    /// External conversation engine
    pub pipeline: Arc<dyn ConversationPipeline>,
    /// Tool gateway
    pub gateway: Arc<ToolGateway>,
    /// Direct synthesis client, when enabled
    pub synthesizer: Option<Arc<SpeechClient>>,
    /// Prometheus render handle
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create application state
    pub fn new(
        config: Settings,
        pipeline: Arc<dyn ConversationPipeline>,
        gateway: Arc<ToolGateway>,
    ) -> Self {
        let synthesizer = config.synthesis.speak_final_text.then(|| {
            Arc::new(SpeechClient::new(SpeechClientConfig {
                endpoint: config.synthesis.endpoint.clone(),
                api_key: config.synthesis.api_key.clone(),
                voice: config.synthesis.voice.clone(),
                sample_rate: config.audio.tts_sample_rate,
                chunk_budget: config.synthesis.chunk_budget,
                max_retries: config.synthesis.max_retries,
                retry_base_delay: Duration::from_millis(config.synthesis.retry_base_delay_ms),
            }))
        });

        Self {
            registry: Arc::new(SessionRegistry::new(config.server.max_sessions)),
            config: Arc::new(config),
            pipeline,
            gateway,
            synthesizer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<PrometheusHandle>) -> Self {
        self.metrics = metrics;
        self
    }
}
