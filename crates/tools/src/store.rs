//! Document store collaborator interface
//!
//! The dashboard's relational document layer lives outside this workspace;
//! tools reach it through this trait. The in-memory implementation exists
//! for tests and engine-less local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Document metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// A full document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub meta: DocumentMeta,
    pub content: String,
}

/// A search hit with its matched range for highlighting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHit {
    pub meta: DocumentMeta,
    pub snippet: String,
    /// Character offset of the match within the document
    pub start: usize,
    /// Character offset one past the match
    pub end: usize,
}

/// CRUD surface the tools depend on
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DocumentHit>, StoreError>;

    async fn read(&self, id: &str) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// In-memory store for tests and local development
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document
    pub fn put(&self, id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) {
        let id = id.into();
        let document = Document {
            meta: DocumentMeta {
                id: id.clone(),
                title: title.into(),
                updated_at: Utc::now(),
            },
            content: content.into(),
        };
        self.documents.write().insert(id, document);
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DocumentHit>, StoreError> {
        let needle = query.to_lowercase();
        let documents = self.documents.read();

        let mut hits: Vec<DocumentHit> = documents
            .values()
            .filter_map(|doc| {
                let haystack = doc.content.to_lowercase();
                haystack.find(&needle).map(|byte_start| {
                    // Offsets are in characters; the client highlights by
                    // character range, not bytes
                    let start = haystack[..byte_start].chars().count();
                    let end = start + needle.chars().count();
                    let snippet: String = doc.content.chars().skip(start).take(120).collect();
                    DocumentHit {
                        meta: doc.meta.clone(),
                        snippet,
                        start,
                        end,
                    }
                })
            })
            .collect();

        hits.sort_by(|a, b| a.meta.id.cmp(&b.meta.id));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn read(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.documents.read().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.documents.write().remove(id).is_some())
    }
}
