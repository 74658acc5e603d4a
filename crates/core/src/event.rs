//! Pipeline output events
//!
//! Everything the conversational pipeline can emit during one interaction,
//! as a closed union the bridge matches exhaustively.

use std::sync::Arc;

use crate::tool::ToolCall;

/// One typed result from a pipeline run.
///
/// The sequence for a single interaction ends when the underlying stream
/// completes; an `Error` item does not necessarily terminate it.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Partial recognition of the user's speech
    AsrPartial { text: String },
    /// Final recognition of the user's speech
    AsrFinal { text: String },
    /// Incremental agent response text
    TextDelta { text: String },
    /// Authoritative full response text, replaces accumulated deltas
    TextFinal { text: String },
    /// Synthesized output audio, 32-bit float samples in [-1, 1]
    Audio {
        samples: Arc<[f32]>,
        sample_rate: u32,
    },
    /// Request to invoke a named tool; the run suspends until the result
    /// is pushed back
    ToolCall(ToolCall),
    /// Custom state to mirror into the client
    StateSync {
        key: String,
        value: serde_json::Value,
    },
    /// Failure inside the pipeline; benign conditions are matched by
    /// message content and not surfaced
    Error { message: String },
}

impl PipelineEvent {
    /// Short tag for logging
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::AsrPartial { .. } => "asr_partial",
            PipelineEvent::AsrFinal { .. } => "asr_final",
            PipelineEvent::TextDelta { .. } => "text_delta",
            PipelineEvent::TextFinal { .. } => "text_final",
            PipelineEvent::Audio { .. } => "audio",
            PipelineEvent::ToolCall(_) => "tool_call",
            PipelineEvent::StateSync { .. } => "state_sync",
            PipelineEvent::Error { .. } => "error",
        }
    }
}
