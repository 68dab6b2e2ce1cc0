//! RAGent Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the RAGent system:
//! - Document and chunk models
//! - Retrieval query and result types
//! - Common error types
//! - Shared traits for generation clients and ingest observers
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConfigError, LlmConfig, LlmProvider, LoggingConfig, RetrievalConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for RAGent operations
#[derive(Error, Debug)]
pub enum RagentError {
    /// Caller error (bad chunk size, overlap, top_k). Never retried.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Vector dimensionality differs from the index's established
    /// dimensionality. Configuration/programmer error, surfaced immediately.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Remote service asked us to back off. Retryable.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Remote service unreachable or returned a server error. Retryable.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Embedding call failed in a non-retryable way.
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Document ingest aborted; the index holds no records for the document.
    #[error("Ingest failed: {0}")]
    IngestFailed(String),

    /// Query could not be resolved. Distinct from an empty result.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Answer generation failed. Surfaced verbatim, never retried by the core.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation cancelled between chunks; partial records are rolled back.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RagentError {
    /// Whether the operation may succeed if retried after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::ServiceUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, RagentError>;

// ============================================================================
// Document Models
// ============================================================================

/// A source document in the system.
///
/// Created on upload and immutable once stored; removed only by an
/// explicit delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: Uuid,

    /// Extracted raw text
    pub text: String,

    /// Arbitrary metadata (filename, upload source, ...)
    pub metadata: HashMap<String, String>,

    /// Upload timestamp
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document from extracted text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Source filename, if recorded at upload time
    pub fn filename(&self) -> Option<&str> {
        self.metadata.get("filename").map(|s| s.as_str())
    }
}

/// A contiguous span of a document's text used as a retrieval unit.
///
/// Offsets count Unicode scalar values (chars), not bytes. Chunks from one
/// document, concatenated with overlap removed, reconstruct the original
/// text ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier
    pub id: Uuid,

    /// Parent document ID
    pub document_id: Uuid,

    /// Ordered index within the document
    pub index: u32,

    /// Text content of this span
    pub text: String,

    /// Starting char offset in the document text (inclusive)
    pub start_offset: usize,

    /// Ending char offset (exclusive)
    pub end_offset: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        index: u32,
        text: impl Into<String>,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            index,
            text: text.into(),
            start_offset,
            end_offset,
        }
    }

    /// Span length in chars
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Whether the span is empty
    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

// ============================================================================
// Retrieval Types
// ============================================================================

/// Filter applied to stored records during search.
///
/// A record matches when its document ID equals `document_id` (if set) and
/// its source metadata contains every `metadata` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Restrict to records from one document
    pub document_id: Option<Uuid>,

    /// Required source metadata entries (exact match)
    pub metadata: HashMap<String, String>,
}

impl SearchFilter {
    /// A filter that matches every record
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to a single document
    pub fn for_document(document_id: Uuid) -> Self {
        Self {
            document_id: Some(document_id),
            metadata: HashMap::new(),
        }
    }

    /// Require a source metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether this filter places no constraints
    pub fn is_empty(&self) -> bool {
        self.document_id.is_none() && self.metadata.is_empty()
    }
}

/// A retrieval query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// User's question
    pub question: String,

    /// Maximum number of results to return
    pub top_k: usize,

    /// Optional metadata filters
    pub filter: SearchFilter,
}

impl RetrievalQuery {
    /// Create a new query with the default top-k of 5
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: 5,
            filter: SearchFilter::any(),
        }
    }

    /// Set top-k
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Set the search filter
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// A chunk scored against a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,

    /// Display metadata carried with the vector record (filename, ...)
    pub source: HashMap<String, String>,

    /// Similarity score (higher is better)
    pub score: f32,
}

/// Ranked context set returned by a query.
///
/// Empty means "no relevant results", which is not an error; retrieval
/// failures are reported as `RagentError` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedContext {
    /// Results in descending score order, length <= top_k
    pub results: Vec<ScoredChunk>,
}

impl RetrievedContext {
    /// Whether no results matched
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Deduplicated source filenames, in first-seen order
    pub fn sources(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for result in &self.results {
            if let Some(source) = result.source.get("filename") {
                if !seen.contains(source) {
                    seen.push(source.clone());
                }
            }
        }
        seen
    }
}

// ============================================================================
// Ingest Lifecycle
// ============================================================================

/// Lifecycle states of a document ingest.
///
/// `Uploaded -> Chunking -> Embedding -> Indexed` on success, or a terminal
/// `Failed` leaving the index unchanged for that document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    Uploaded,
    Chunking,
    Embedding,
    Indexed,
    Failed,
}

impl IngestState {
    /// Whether this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Indexed | Self::Failed)
    }
}

impl std::fmt::Display for IngestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uploaded => write!(f, "uploaded"),
            Self::Chunking => write!(f, "chunking"),
            Self::Embedding => write!(f, "embedding"),
            Self::Indexed => write!(f, "indexed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for answer-generation clients (the external Answer Assembler's
/// transport). Errors are surfaced verbatim to the caller.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response for a fully built prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Best-effort notification hook called at each ingest lifecycle transition.
///
/// Absence of a listener must not affect correctness; implementations must
/// not block or fail the ingest.
pub trait IngestObserver: Send + Sync {
    /// Called after the document enters `state`
    fn on_transition(&self, document_id: Uuid, state: IngestState);
}

/// Observer that ignores every transition
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl IngestObserver for NoopObserver {
    fn on_transition(&self, _document_id: Uuid, _state: IngestState) {}
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryability() {
        assert!(RagentError::RateLimited("429".into()).is_retryable());
        assert!(RagentError::ServiceUnavailable("503".into()).is_retryable());
        assert!(!RagentError::InvalidParameter("top_k".into()).is_retryable());
        assert!(!RagentError::DimensionMismatch {
            expected: 768,
            actual: 4
        }
        .is_retryable());
        assert!(!RagentError::GenerationFailed("boom".into()).is_retryable());
    }

    #[test]
    fn test_document_builder() {
        let doc = Document::new("hello world").with_metadata("filename", "notes.pdf");

        assert_eq!(doc.text, "hello world");
        assert_eq!(doc.filename(), Some("notes.pdf"));
    }

    #[test]
    fn test_chunk_span() {
        let chunk = Chunk::new(Uuid::new_v4(), 0, "abcde", 10, 15);
        assert_eq!(chunk.len(), 5);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_query_builder() {
        let query = RetrievalQuery::new("what is a chunk?")
            .with_top_k(3)
            .with_filter(SearchFilter::any().with_metadata("lang", "en"));

        assert_eq!(query.top_k, 3);
        assert_eq!(query.filter.metadata.get("lang"), Some(&"en".to_string()));
    }

    #[test]
    fn test_context_sources_deduplicated() {
        let doc_id = Uuid::new_v4();
        let mk = |idx, file: &str| ScoredChunk {
            chunk: Chunk::new(doc_id, idx, "text", 0, 4),
            source: HashMap::from([("filename".to_string(), file.to_string())]),
            score: 0.5,
        };

        let context = RetrievedContext {
            results: vec![mk(0, "a.pdf"), mk(1, "b.pdf"), mk(2, "a.pdf")],
        };

        assert_eq!(context.sources(), vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_ingest_state_terminal() {
        assert!(IngestState::Indexed.is_terminal());
        assert!(IngestState::Failed.is_terminal());
        assert!(!IngestState::Chunking.is_terminal());
        assert_eq!(IngestState::Embedding.to_string(), "embedding");
    }
}
