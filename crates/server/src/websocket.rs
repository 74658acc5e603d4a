//! WebSocket session endpoint
//!
//! One socket per session. JSON text frames carry control messages,
//! binary frames carry 16-bit LE PCM at the client's native rate; both
//! directions share the socket. Malformed control messages are dropped
//! silently to tolerate version skew.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use voice_bridge_agent::{BridgeConfig, SessionBridge};
use voice_bridge_core::{Role, SessionContext};
use voice_bridge_transport::{decode_pcm16, parse_client_message, OutboundFrame};

use crate::state::AppState;

/// Connection identity, resolved upstream by the dashboard's auth layer
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub privileged: bool,
}

fn default_user() -> String {
    "anonymous".to_string()
}

/// Upgrade handler for `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(socket: WebSocket, state: AppState, params: ConnectParams) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let ctx = SessionContext::new(session_id, params.user, params.role)
        .with_privileged(params.privileged)
        .with_persona(state.config.session.persona.clone());

    let (bridge, mut outbound) = SessionBridge::new(
        ctx,
        BridgeConfig::from_settings(&state.config),
        state.pipeline.clone(),
        state.gateway.clone(),
        state.synthesizer.clone(),
    );

    if let Err(e) = state.registry.insert(bridge.clone()) {
        tracing::warn!(error = %e, "Rejecting connection");
        return;
    }
    metrics::counter!("voice_bridge_sessions_total").increment(1);

    let (mut sink, mut stream) = socket.split();

    // Outbound pump: control messages as text, audio as binary
    let pump = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let message = match frame {
                OutboundFrame::Control(msg) => match serde_json::to_string(&msg) {
                    Ok(json) => Message::Text(json),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode control message");
                        continue;
                    }
                },
                OutboundFrame::Audio(bytes) => Message::Binary(bytes.to_vec()),
            };
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    match bridge.connect().await {
        Ok(()) => {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(msg) = parse_client_message(&text) {
                            bridge.handle_message(msg).await;
                        }
                    }
                    Ok(Message::Binary(data)) => {
                        bridge.push_audio(decode_pcm16(&data)).await;
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
        Err(e) => {
            tracing::error!(session = %bridge.session_id(), error = %e, "Session initialization failed");
        }
    }

    bridge.cleanup().await;
    state.registry.remove(bridge.session_id());
    pump.abort();
    tracing::info!(session = %bridge.session_id(), "Connection closed");
}
