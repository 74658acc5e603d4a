//! Tool call and tool result contracts
//!
//! Tool calls originate from the reasoning stage of the pipeline; results
//! are produced by the tool gateway and flow both back into the pipeline
//! context and out to the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request from the pipeline to invoke a named server-side action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates the result with the call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Named arguments
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

/// Outcome of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the originating call
    pub id: String,
    /// Whether the call succeeded
    pub ok: bool,
    /// Result payload on success
    pub payload: Value,
    /// Error description on failure
    pub error: Option<String>,
    /// Optional client-visible side effect
    pub ui: Option<UiEffect>,
}

impl ToolResult {
    /// Build a success result
    pub fn success(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            ok: true,
            payload,
            error: None,
            ui: None,
        }
    }

    /// Build a failure result
    pub fn failure(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            payload: Value::Null,
            error: Some(message.into()),
            ui: None,
        }
    }

    pub fn with_ui(mut self, effect: UiEffect) -> Self {
        self.ui = Some(effect);
        self
    }
}

/// Severity of a client notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Client-side side effect a tool may request, relayed verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiEffect {
    /// Navigate the dashboard to a path
    Navigate { path: String },
    /// Open a document in the reader pane
    OpenDocument { document_id: String },
    /// Highlight a character range within an open document
    HighlightRange {
        document_id: String,
        start: usize,
        end: usize,
    },
    /// Flip a named client flag
    ToggleFlag { name: String, value: bool },
    /// Show a transient notice
    ShowNotice { level: NoticeLevel, message: String },
}
