//! RAGent Vector - Vector index and embedding abstraction
//!
//! Defines the `VectorStore` trait for storing (vector, payload) records and
//! answering nearest-neighbor queries, the in-memory linear-scan index in
//! [`memory`], and the `EmbeddingClient` trait with hosted-API
//! implementations in [`embedding`].

use async_trait::async_trait;
use ragent_core::{Chunk, Result, ScoredChunk, SearchFilter};
use std::collections::HashMap;
use uuid::Uuid;

pub mod embedding;
pub mod memory;

pub use embedding::{create_embedding_client, EmbeddingClient, GeminiEmbedding, OllamaEmbedding};
pub use memory::InMemoryIndex;

// ============================================================================
// Records and Metrics
// ============================================================================

/// A stored vector with its display payload.
///
/// The index exclusively owns its records; the chunk text and source
/// metadata are carried so search results can be displayed without a
/// lookup elsewhere.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// The chunk this vector represents
    pub chunk: Chunk,

    /// Fixed-length embedding
    pub embedding: Vec<f32>,

    /// Document display metadata (filename, ...)
    pub source: HashMap<String, String>,
}

impl VectorRecord {
    /// Create a record for a chunk
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk,
            embedding,
            source: HashMap::new(),
        }
    }

    /// Attach a source metadata entry
    pub fn with_source(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.source.insert(key.into(), value.into());
        self
    }

    /// Chunk identifier
    pub fn chunk_id(&self) -> Uuid {
        self.chunk.id
    }

    /// Whether this record passes a filter
    pub fn matches(&self, filter: &SearchFilter) -> bool {
        if let Some(document_id) = filter.document_id {
            if self.chunk.document_id != document_id {
                return false;
            }
        }
        filter
            .metadata
            .iter()
            .all(|(k, v)| self.source.get(k) == Some(v))
    }
}

/// Similarity metric used to score records against a query vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Metric {
    /// Cosine similarity; zero-norm vectors score 0.0
    #[default]
    Cosine,
    /// Raw dot product
    Dot,
}

impl Metric {
    /// Score two vectors of equal length
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Dot => dot(a, b),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity `dot(a,b) / (|a|*|b|)`.
///
/// Returns 0.0 when either vector has zero norm, avoiding division by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Trait for vector index operations.
///
/// The in-memory implementation is an exact linear scan; an
/// approximate-nearest-neighbor structure may be substituted behind this
/// trait without touching the Retriever.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a record. The first insert fixes the index dimensionality;
    /// later inserts with a different vector length fail with
    /// `DimensionMismatch` and leave the index unchanged.
    async fn insert(&self, record: VectorRecord) -> Result<()>;

    /// Store several records atomically: either all are inserted or,
    /// on a dimension mismatch, none are.
    async fn insert_batch(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Return the `top_k` records most similar to `query`, descending by
    /// score, ties broken by insertion order (earlier inserted wins).
    /// An empty index yields an empty result, never an error.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredChunk>>;

    /// Remove a record by chunk id; no-op if absent.
    async fn delete(&self, chunk_id: Uuid) -> Result<()>;

    /// Remove all records belonging to a document, returning the count.
    async fn delete_by_document(&self, document_id: Uuid) -> Result<u64>;

    /// Number of stored records
    async fn len(&self) -> usize;

    /// Backend name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identity() {
        let v = vec![0.3, -1.2, 4.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_invariant_under_positive_scaling() {
        let query = vec![0.5, 0.1, -0.7];
        let v = vec![1.0, 2.0, 3.0];
        let scaled: Vec<f32> = v.iter().map(|x| x * 42.0).collect();

        let s1 = cosine_similarity(&v, &query);
        let s2 = cosine_similarity(&scaled, &query);
        assert!((s1 - s2).abs() < 1e-6);
    }

    #[test]
    fn test_record_filter_matching() {
        let chunk = Chunk::new(Uuid::new_v4(), 0, "text", 0, 4);
        let doc_id = chunk.document_id;
        let record =
            VectorRecord::new(chunk, vec![1.0, 0.0]).with_source("filename", "report.pdf");

        assert!(record.matches(&SearchFilter::any()));
        assert!(record.matches(&SearchFilter::for_document(doc_id)));
        assert!(!record.matches(&SearchFilter::for_document(Uuid::new_v4())));
        assert!(record.matches(&SearchFilter::any().with_metadata("filename", "report.pdf")));
        assert!(!record.matches(&SearchFilter::any().with_metadata("filename", "other.pdf")));
        assert!(!record.matches(&SearchFilter::any().with_metadata("lang", "en")));
    }
}
