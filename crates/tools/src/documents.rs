//! Document tools exposed to the pipeline

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use voice_bridge_core::{NoticeLevel, SessionContext, UiEffect};

use crate::gateway::{require_str, Tool, ToolError, ToolOutcome};
use crate::store::DocumentStore;

const SEARCH_LIMIT: usize = 5;

/// Full-text search over the user's documents
pub struct SearchDocumentsTool {
    store: Arc<dyn DocumentStore>,
}

impl SearchDocumentsTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search the workspace documents for a phrase"
    }

    async fn execute(
        &self,
        arguments: &Map<String, Value>,
        _ctx: &SessionContext,
    ) -> Result<ToolOutcome, ToolError> {
        let query = require_str(arguments, "query")?;

        let hits = self
            .store
            .search(query, SEARCH_LIMIT)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let payload = json!({
            "query": query,
            "hits": hits.iter().map(|h| json!({
                "document_id": h.meta.id,
                "title": h.meta.title,
                "snippet": h.snippet,
            })).collect::<Vec<_>>(),
        });

        // Highlight the best match so the client mirrors what the agent saw
        let outcome = match hits.first() {
            Some(best) => ToolOutcome::new(payload).with_ui(UiEffect::HighlightRange {
                document_id: best.meta.id.clone(),
                start: best.start,
                end: best.end,
            }),
            None => ToolOutcome::new(payload),
        };

        Ok(outcome)
    }
}

/// Read one document by id
pub struct ReadDocumentTool {
    store: Arc<dyn DocumentStore>,
}

impl ReadDocumentTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadDocumentTool {
    fn name(&self) -> &str {
        "read_document"
    }

    fn description(&self) -> &str {
        "Read the full content of a document"
    }

    async fn execute(
        &self,
        arguments: &Map<String, Value>,
        _ctx: &SessionContext,
    ) -> Result<ToolOutcome, ToolError> {
        let id = require_str(arguments, "document_id")?;

        let document = self
            .store
            .read(id)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?
            .ok_or_else(|| ToolError::Execution(format!("Document not found: {}", id)))?;

        let payload = json!({
            "document_id": document.meta.id,
            "title": document.meta.title,
            "content": document.content,
        });

        Ok(ToolOutcome::new(payload).with_ui(UiEffect::OpenDocument {
            document_id: document.meta.id,
        }))
    }
}

/// Delete a document. Admin-gated.
pub struct DeleteDocumentTool {
    store: Arc<dyn DocumentStore>,
}

impl DeleteDocumentTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteDocumentTool {
    fn name(&self) -> &str {
        "delete_document"
    }

    fn description(&self) -> &str {
        "Permanently delete a document"
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        arguments: &Map<String, Value>,
        ctx: &SessionContext,
    ) -> Result<ToolOutcome, ToolError> {
        let id = require_str(arguments, "document_id")?;

        let deleted = self
            .store
            .delete(id)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        if !deleted {
            return Err(ToolError::Execution(format!("Document not found: {}", id)));
        }

        tracing::info!(document = id, user = %ctx.user_id, "Document deleted via voice tool");

        Ok(
            ToolOutcome::new(json!({ "deleted": id })).with_ui(UiEffect::ShowNotice {
                level: NoticeLevel::Info,
                message: format!("Deleted document {}", id),
            }),
        )
    }
}

/// Navigate the dashboard to a named section
pub struct NavigateDashboardTool {
    allowed: Vec<&'static str>,
}

impl NavigateDashboardTool {
    pub fn new() -> Self {
        Self {
            allowed: vec!["home", "documents", "search", "settings", "billing"],
        }
    }
}

impl Default for NavigateDashboardTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for NavigateDashboardTool {
    fn name(&self) -> &str {
        "navigate_dashboard"
    }

    fn description(&self) -> &str {
        "Move the dashboard to a named section"
    }

    async fn execute(
        &self,
        arguments: &Map<String, Value>,
        _ctx: &SessionContext,
    ) -> Result<ToolOutcome, ToolError> {
        let section = require_str(arguments, "section")?;

        if !self.allowed.contains(&section) {
            return Err(ToolError::InvalidArgument {
                name: "section",
                message: format!("unknown section '{}'", section),
            });
        }

        let path = format!("/{}", section);
        Ok(ToolOutcome::new(json!({ "navigated_to": path })).with_ui(UiEffect::Navigate { path }))
    }
}
