//! Tool execution gateway for the voice session bridge
//!
//! Tools are named server-side actions the pipeline's reasoning stage may
//! invoke. The gateway enforces role-based access, converts every failure
//! into a structured result, and carries optional client-visible side
//! effects back to the session.

pub mod documents;
pub mod gateway;
pub mod store;

pub use documents::{
    DeleteDocumentTool, NavigateDashboardTool, ReadDocumentTool, SearchDocumentsTool,
};
pub use gateway::{Tool, ToolError, ToolGateway, ToolOutcome};
pub use store::{Document, DocumentHit, DocumentMeta, DocumentStore, InMemoryDocumentStore, StoreError};

use std::sync::Arc;

/// Build a gateway wired with the standard document tools
pub fn create_document_gateway(store: Arc<dyn store::DocumentStore>) -> ToolGateway {
    let mut gateway = ToolGateway::new();
    gateway.register(Arc::new(SearchDocumentsTool::new(store.clone())));
    gateway.register(Arc::new(ReadDocumentTool::new(store.clone())));
    gateway.register(Arc::new(DeleteDocumentTool::new(store)));
    gateway.register(Arc::new(NavigateDashboardTool::new()));
    gateway
}
