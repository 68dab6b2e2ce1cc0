//! Document registry tracking ingest lifecycle state.
//!
//! Keeps the authoritative copy of each document alongside its current
//! ingest state, so the API can report progress and list what has been
//! uploaded. Vector records live separately in the index.

use ragent_core::{Document, IngestState, RagentError, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A registered document with its lifecycle state
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// The document as uploaded
    pub document: Document,

    /// Current ingest state
    pub state: IngestState,

    /// Number of chunks produced, known once chunking completes
    pub chunk_count: usize,
}

/// In-memory document registry
pub struct DocumentStore {
    inner: RwLock<HashMap<Uuid, StoredDocument>>,
}

impl DocumentStore {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Register a document in the `Uploaded` state
    pub async fn insert(&self, document: Document) {
        let mut inner = self.inner.write().await;
        inner.insert(
            document.id,
            StoredDocument {
                document,
                state: IngestState::Uploaded,
                chunk_count: 0,
            },
        );
    }

    /// Look up a document by id
    pub async fn get(&self, id: Uuid) -> Result<StoredDocument> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| RagentError::NotFound(format!("document {id}")))
    }

    /// List all registered documents
    pub async fn list(&self) -> Vec<StoredDocument> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Advance a document's lifecycle state
    pub async fn set_state(&self, id: Uuid, state: IngestState) {
        if let Some(entry) = self.inner.write().await.get_mut(&id) {
            entry.state = state;
        }
    }

    /// Record how many chunks a document produced
    pub async fn set_chunk_count(&self, id: Uuid, count: usize) {
        if let Some(entry) = self.inner.write().await.get_mut(&id) {
            entry.chunk_count = count;
        }
    }

    /// Remove a document, returning it if present
    pub async fn remove(&self, id: Uuid) -> Option<StoredDocument> {
        self.inner.write().await.remove(&id)
    }

    /// Number of registered documents
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = DocumentStore::new();
        let doc = Document::new("hello").with_metadata("filename", "a.txt");
        let id = doc.id;

        store.insert(doc).await;

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.state, IngestState::Uploaded);
        assert_eq!(stored.document.filename(), Some("a.txt"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = DocumentStore::new();
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RagentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_state_and_chunk_count_updates() {
        let store = DocumentStore::new();
        let doc = Document::new("text");
        let id = doc.id;
        store.insert(doc).await;

        store.set_state(id, IngestState::Indexed).await;
        store.set_chunk_count(id, 7).await;

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.state, IngestState::Indexed);
        assert_eq!(stored.chunk_count, 7);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = DocumentStore::new();
        let doc = Document::new("text");
        let id = doc.id;
        store.insert(doc).await;

        assert!(store.remove(id).await.is_some());
        assert!(store.remove(id).await.is_none());
        assert!(store.is_empty().await);
    }
}
