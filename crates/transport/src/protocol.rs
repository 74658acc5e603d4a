//! Client/server control message set
//!
//! Unknown or malformed inbound messages are dropped without a reply to
//! tolerate minor client/server version skew.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use voice_bridge_core::UiEffect;

/// Structured messages the client can send; user audio arrives as raw
/// binary frames, not through this enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Begin an audio capture
    Start,
    /// End the capture; buffered audio still drains through the pipeline
    Stop,
    /// Interrupt the in-progress response
    BargeIn,
    /// A typed query
    Text { text: String },
}

/// Session state as visible on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireState {
    Idle,
    Listening,
    Processing,
    Speaking,
}

/// Tool lifecycle status shown to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Started,
    Succeeded,
    Failed,
}

/// Structured messages the server can send; TTS audio goes out as raw
/// binary frames alongside these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Wire-visible state change
    State { state: WireState },
    /// Partial recognition of the user's speech
    AsrPartial { text: String },
    /// Final recognition of the user's speech
    AsrFinal { text: String },
    /// Cumulative agent response text so far
    AgentTextPartial { text: String },
    /// Complete agent response for the interaction
    AgentTextFinal { text: String },
    /// Surfaced failure; the session has returned to idle
    Error { message: String },
    /// Sample rates negotiated for this session
    Config {
        #[serde(rename = "ttsSampleRate")]
        tts_sample_rate: u32,
        #[serde(rename = "inputSampleRate")]
        input_sample_rate: u32,
    },
    /// Tool invocation lifecycle
    Tool { name: String, status: ToolStatus },
    /// Client-side side effect requested by a tool, relayed verbatim
    UiEffect { effect: UiEffect },
    /// Custom state mirrored from the pipeline
    Sync { key: String, value: Value },
}

/// Decode an inbound control message.
///
/// Returns `None` for anything that does not parse as a known message.
pub fn parse_client_message(raw: &str) -> Option<ClientMessage> {
    match serde_json::from_str(raw) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable client message");
            None
        }
    }
}
