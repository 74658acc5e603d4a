//! Conversational pipeline collaborator interface
//!
//! The engine performing STT, reasoning/tool-use, and TTS lives outside
//! this workspace; the bridge drives it through this trait only.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::audio::AudioFrame;
use crate::error::Result;
use crate::event::PipelineEvent;
use crate::session::SessionContext;
use crate::tool::ToolResult;

/// Lazily produced, single-consumer sequence of normalized audio frames
pub type AudioStream = Pin<Box<dyn Stream<Item = AudioFrame> + Send>>;

/// Lazily produced sequence of typed pipeline results for one interaction
pub type EventStream = Pin<Box<dyn Stream<Item = PipelineEvent> + Send>>;

/// Input for one pipeline interaction
pub enum PipelineInput {
    /// Captured user audio, already resampled to the pipeline rate
    Audio(AudioStream),
    /// A text query
    Text { text: String },
}

impl std::fmt::Debug for PipelineInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineInput::Audio(_) => f.write_str("PipelineInput::Audio(..)"),
            PipelineInput::Text { text } => f.debug_struct("PipelineInput::Text").field("text", text).finish(),
        }
    }
}

/// Entry points the bridge needs from the external conversation engine
#[async_trait]
pub trait ConversationPipeline: Send + Sync {
    /// Prepare engine-side state for a new session (persona, metadata)
    async fn open_session(&self, ctx: &SessionContext) -> Result<()>;

    /// Run one interaction. The returned stream ends when the interaction
    /// completes; output arriving after an interrupt is discarded by the
    /// caller, not the engine.
    async fn run(&self, ctx: &SessionContext, input: PipelineInput) -> Result<EventStream>;

    /// Merge a tool result into the in-flight interaction so it can resume
    async fn push_tool_result(&self, ctx: &SessionContext, result: ToolResult) -> Result<()>;

    /// Ask the engine to stop emitting output for this session (barge-in).
    /// Best effort; does not guarantee in-flight work is aborted.
    async fn interrupt(&self, ctx: &SessionContext) -> Result<()>;

    /// Tear down engine-side state on disconnect
    async fn close_session(&self, ctx: &SessionContext) -> Result<()>;
}
