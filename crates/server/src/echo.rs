//! Loopback pipeline
//!
//! Stands in for the external conversation engine during local
//! development and tests: text queries are echoed back as deltas, audio
//! captures are acknowledged by duration. Not wired in production
//! deployments, which inject a real engine.

use async_trait::async_trait;
use futures::StreamExt;

use voice_bridge_core::{
    ConversationPipeline, EventStream, PipelineEvent, PipelineInput, Result, SessionContext,
    ToolResult,
};

/// Engine-less pipeline for local runs
#[derive(Debug, Default)]
pub struct EchoPipeline;

impl EchoPipeline {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConversationPipeline for EchoPipeline {
    async fn open_session(&self, ctx: &SessionContext) -> Result<()> {
        tracing::debug!(session = %ctx.session_id, "Echo pipeline session opened");
        Ok(())
    }

    async fn run(&self, _ctx: &SessionContext, input: PipelineInput) -> Result<EventStream> {
        match input {
            PipelineInput::Text { text } => Ok(Box::pin(futures::stream::iter(vec![
                PipelineEvent::TextDelta {
                    text: "You said: ".to_string(),
                },
                PipelineEvent::TextDelta { text },
            ]))),
            PipelineInput::Audio(mut audio) => Ok(Box::pin(async_stream::stream! {
                let mut samples: u64 = 0;
                let mut rate: u32 = 0;
                while let Some(frame) = audio.next().await {
                    samples += frame.len() as u64;
                    rate = frame.sample_rate;
                }

                if samples == 0 {
                    // Matched as benign by the bridge; logged, not surfaced
                    yield PipelineEvent::Error {
                        message: "no speech detected".to_string(),
                    };
                } else {
                    let ms = samples * 1000 / rate.max(1) as u64;
                    yield PipelineEvent::AsrFinal {
                        text: format!("(captured {} ms of audio)", ms),
                    };
                    yield PipelineEvent::TextDelta {
                        text: format!("I heard {} ms of audio.", ms),
                    };
                }
            })),
        }
    }

    async fn push_tool_result(&self, _ctx: &SessionContext, _result: ToolResult) -> Result<()> {
        Ok(())
    }

    async fn interrupt(&self, ctx: &SessionContext) -> Result<()> {
        tracing::debug!(session = %ctx.session_id, "Echo pipeline interrupted");
        Ok(())
    }

    async fn close_session(&self, ctx: &SessionContext) -> Result<()> {
        tracing::debug!(session = %ctx.session_id, "Echo pipeline session closed");
        Ok(())
    }
}
