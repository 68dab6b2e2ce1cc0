//! In-memory vector index using an exact linear scan.
//!
//! Records live in insertion order inside a `tokio::sync::RwLock`, which
//! gives read-after-write consistency: a search started after an insert
//! completes sees that insert. Exact scan keeps recall at 1.0; latency is
//! linear in the record count, acceptable at the scale this index targets.

use async_trait::async_trait;
use ragent_core::{RagentError, Result, ScoredChunk, SearchFilter};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Metric, VectorRecord, VectorStore};

/// Exact-scan in-memory vector index
pub struct InMemoryIndex {
    inner: RwLock<Inner>,
    metric: Metric,
}

struct Inner {
    /// Dimensionality, fixed by the first insert
    dimension: Option<usize>,

    /// Records in insertion order
    records: Vec<VectorRecord>,
}

impl InMemoryIndex {
    /// Create an empty index using cosine similarity
    pub fn new() -> Self {
        Self::with_metric(Metric::Cosine)
    }

    /// Create an empty index with an explicit metric
    pub fn with_metric(metric: Metric) -> Self {
        Self {
            inner: RwLock::new(Inner {
                dimension: None,
                records: Vec::new(),
            }),
            metric,
        }
    }

    /// Established dimensionality, if any record has been inserted
    pub async fn dimension(&self) -> Option<usize> {
        self.inner.read().await.dimension
    }

    fn check_dimension(inner: &Inner, len: usize) -> Result<()> {
        match inner.dimension {
            Some(expected) if expected != len => Err(RagentError::DimensionMismatch {
                expected,
                actual: len,
            }),
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryIndex {
    async fn insert(&self, record: VectorRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::check_dimension(&inner, record.embedding.len())?;

        inner.dimension.get_or_insert(record.embedding.len());
        inner.records.push(record);
        Ok(())
    }

    async fn insert_batch(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write().await;

        // Validate every vector before touching the store
        let first_len = records[0].embedding.len();
        Self::check_dimension(&inner, first_len)?;
        for record in &records {
            if record.embedding.len() != first_len {
                return Err(RagentError::DimensionMismatch {
                    expected: first_len,
                    actual: record.embedding.len(),
                });
            }
        }

        inner.dimension.get_or_insert(first_len);
        inner.records.extend(records);
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(RagentError::InvalidParameter(
                "top_k must be at least 1".to_string(),
            ));
        }

        let inner = self.inner.read().await;

        // An empty index is not an error
        if inner.records.is_empty() {
            return Ok(Vec::new());
        }

        Self::check_dimension(&inner, query.len())?;

        let mut scored: Vec<ScoredChunk> = inner
            .records
            .iter()
            .filter(|r| r.matches(filter))
            .map(|r| ScoredChunk {
                chunk: r.chunk.clone(),
                source: r.source.clone(),
                score: self.metric.score(&r.embedding, query),
            })
            .collect();

        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn delete(&self, chunk_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.records.retain(|r| r.chunk.id != chunk_id);
        Ok(())
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|r| r.chunk.document_id != document_id);
        Ok((before - inner.records.len()) as u64)
    }

    async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragent_core::Chunk;

    fn record(doc_id: Uuid, index: u32, embedding: Vec<f32>) -> VectorRecord {
        let chunk = Chunk::new(doc_id, index, format!("chunk {index}"), 0, 7);
        VectorRecord::new(chunk, embedding)
    }

    #[tokio::test]
    async fn test_search_empty_index_returns_empty() {
        let index = InMemoryIndex::new();
        let results = index
            .search(&[1.0, 0.0], 5, &SearchFilter::any())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_self_query_is_top_match_with_similarity_one() {
        let index = InMemoryIndex::new();
        let doc_id = Uuid::new_v4();

        index
            .insert(record(doc_id, 0, vec![0.1, 0.9, -0.4]))
            .await
            .unwrap();
        index
            .insert(record(doc_id, 1, vec![-0.8, 0.2, 0.5]))
            .await
            .unwrap();

        let results = index
            .search(&[0.1, 0.9, -0.4], 2, &SearchFilter::any())
            .await
            .unwrap();

        assert_eq!(results[0].chunk.index, 0);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_first_insert_fixes_dimensionality() {
        let index = InMemoryIndex::new();
        let doc_id = Uuid::new_v4();

        index.insert(record(doc_id, 0, vec![1.0, 0.0])).await.unwrap();
        assert_eq!(index.dimension().await, Some(2));

        let err = index
            .insert(record(doc_id, 1, vec![1.0, 0.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RagentError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));

        // Index contents unchanged
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let index = InMemoryIndex::new();
        index
            .insert(record(Uuid::new_v4(), 0, vec![1.0, 0.0]))
            .await
            .unwrap();

        let err = index
            .search(&[1.0, 0.0, 0.0], 1, &SearchFilter::any())
            .await
            .unwrap_err();
        assert!(matches!(err, RagentError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_top_k_ordering_and_truncation() {
        let index = InMemoryIndex::new();
        let doc_id = Uuid::new_v4();

        index.insert(record(doc_id, 0, vec![1.0, 0.0])).await.unwrap();
        index.insert(record(doc_id, 1, vec![0.0, 1.0])).await.unwrap();
        index
            .insert(record(doc_id, 2, vec![0.7, 0.7]))
            .await
            .unwrap();

        let results = index
            .search(&[1.0, 0.0], 2, &SearchFilter::any())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 0);
        assert_eq!(results[1].chunk.index, 2);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_ties_broken_by_insertion_order() {
        let index = InMemoryIndex::new();
        let doc_id = Uuid::new_v4();

        // Same direction, different magnitude: identical cosine scores
        index
            .insert(record(doc_id, 7, vec![2.0, 2.0]))
            .await
            .unwrap();
        index
            .insert(record(doc_id, 3, vec![1.0, 1.0]))
            .await
            .unwrap();

        let results = index
            .search(&[1.0, 1.0], 2, &SearchFilter::any())
            .await
            .unwrap();

        // Earlier inserted wins the tie
        assert_eq!(results[0].chunk.index, 7);
        assert_eq!(results[1].chunk.index, 3);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let index = InMemoryIndex::new();
        let doc_id = Uuid::new_v4();
        let rec = record(doc_id, 0, vec![1.0, 0.0]);
        let chunk_id = rec.chunk_id();

        index.insert(rec).await.unwrap();
        index.delete(chunk_id).await.unwrap();

        let results = index
            .search(&[1.0, 0.0], 5, &SearchFilter::any())
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.chunk.id != chunk_id));

        // Deleting again is a no-op, not an error
        index.delete(chunk_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let index = InMemoryIndex::new();
        let keep = Uuid::new_v4();
        let gone = Uuid::new_v4();

        index.insert(record(keep, 0, vec![1.0, 0.0])).await.unwrap();
        index.insert(record(gone, 0, vec![0.0, 1.0])).await.unwrap();
        index.insert(record(gone, 1, vec![0.5, 0.5])).await.unwrap();

        let removed = index.delete_by_document(gone).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_metadata_filter_restricts_results() {
        let index = InMemoryIndex::new();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();

        index
            .insert(record(doc_a, 0, vec![1.0, 0.0]).with_source("filename", "a.pdf"))
            .await
            .unwrap();
        index
            .insert(record(doc_b, 0, vec![1.0, 0.0]).with_source("filename", "b.pdf"))
            .await
            .unwrap();

        let results = index
            .search(
                &[1.0, 0.0],
                5,
                &SearchFilter::any().with_metadata("filename", "b.pdf"),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.document_id, doc_b);

        let results = index
            .search(&[1.0, 0.0], 5, &SearchFilter::for_document(doc_a))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.document_id, doc_a);
    }

    #[tokio::test]
    async fn test_insert_batch_is_atomic() {
        let index = InMemoryIndex::new();
        let doc_id = Uuid::new_v4();

        let bad_batch = vec![
            record(doc_id, 0, vec![1.0, 0.0]),
            record(doc_id, 1, vec![1.0, 0.0, 0.0]),
        ];
        assert!(index.insert_batch(bad_batch).await.is_err());
        assert_eq!(index.len().await, 0);

        let good_batch = vec![
            record(doc_id, 0, vec![1.0, 0.0]),
            record(doc_id, 1, vec![0.0, 1.0]),
        ];
        index.insert_batch(good_batch).await.unwrap();
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn test_top_k_zero_is_invalid() {
        let index = InMemoryIndex::new();
        let err = index
            .search(&[1.0], 0, &SearchFilter::any())
            .await
            .unwrap_err();
        assert!(matches!(err, RagentError::InvalidParameter(_)));
    }
}
