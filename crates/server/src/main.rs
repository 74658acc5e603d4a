//! Voice bridge server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use voice_bridge_config::Settings;
use voice_bridge_server::{create_router, init_metrics, AppState, EchoPipeline};
use voice_bridge_tools::{create_document_gateway, InMemoryDocumentStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional config file path as the first argument
    let config_path = std::env::args().nth(1);
    let config = Settings::load(config_path.as_deref())?;

    init_tracing(&config);
    tracing::info!("Starting voice bridge v{}", env!("CARGO_PKG_VERSION"));

    let metrics_handle = if config.observability.metrics_enabled {
        init_metrics()
    } else {
        None
    };

    // The conversation engine and document store are injected in real
    // deployments; the loopback pipeline keeps local runs self-contained.
    let store = Arc::new(InMemoryDocumentStore::new());
    let gateway = Arc::new(create_document_gateway(store));
    let pipeline = Arc::new(EchoPipeline::new());

    let state = AppState::new(config.clone(), pipeline, gateway).with_metrics(metrics_handle);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

/// Initialize tracing from the observability config; RUST_LOG wins when set
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{},tower_http=info", config.observability.log_level).into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    if config.observability.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
