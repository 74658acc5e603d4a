//! Core types for the voice session bridge
//!
//! This crate provides the shared vocabulary used across all other crates:
//! - Audio frame types and sample conversion
//! - Pipeline output events and the pipeline collaborator trait
//! - Tool call / tool result contracts
//! - Session identity and error types

pub mod audio;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod session;
pub mod tool;

pub use audio::{f32_to_i16, AudioFrame};
pub use error::{Error, Result};
pub use event::PipelineEvent;
pub use pipeline::{AudioStream, ConversationPipeline, EventStream, PipelineInput};
pub use session::{Role, SessionContext};
pub use tool::{NoticeLevel, ToolCall, ToolResult, UiEffect};
