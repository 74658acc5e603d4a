//! WebSocket and HTTP server for the voice session bridge

pub mod echo;
pub mod http;
pub mod registry;
pub mod state;
pub mod websocket;

pub use echo::EchoPipeline;
pub use http::create_router;
pub use registry::SessionRegistry;
pub use state::AppState;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Session capacity reached ({0} active)")]
    Capacity(usize),

    #[error("Session error: {0}")]
    Session(String),
}

/// Install the Prometheus recorder. Returns `None` when a recorder is
/// already installed (tests) or installation fails.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    }
}
