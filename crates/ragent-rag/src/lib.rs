//! RAGent RAG - Retrieval orchestration
//!
//! The [`Retriever`] drives the ingest pipeline (chunk, embed with retry,
//! index) and answers retrieval queries against the vector index. Ingest is
//! all-or-nothing per document: any failure or cancellation rolls back every
//! record already written for that document, so a partially ingested
//! document is never queryable.

use ragent_core::{
    Document, IngestObserver, IngestState, NoopObserver, RagentError, Result, RetrievalConfig,
    RetrievalQuery, RetrievedContext,
};
use ragent_parser::Chunker;
use ragent_vector::{EmbeddingClient, VectorRecord, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub mod llm;
pub mod retry;
pub mod store;

pub use llm::{create_llm_client, Answer, AnswerAssembler, GeminiClient, OllamaClient, PromptBuilder};
pub use retry::RetryPolicy;
pub use store::{DocumentStore, StoredDocument};

// ============================================================================
// Ingest Receipt
// ============================================================================

/// Outcome of a successful ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReceipt {
    /// Id of the ingested document
    pub document_id: Uuid,

    /// Number of chunks produced and indexed
    pub chunk_count: usize,

    /// Final lifecycle state (always `Indexed` on success)
    pub state: IngestState,
}

// ============================================================================
// Retriever
// ============================================================================

/// Orchestrates document ingest and retrieval queries
pub struct Retriever {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorStore>,
    store: Arc<DocumentStore>,
    observer: Arc<dyn IngestObserver>,
    retry: RetryPolicy,
    batch_size: usize,
}

impl Retriever {
    /// Create a retriever over an embedder and a vector index
    pub fn new(
        config: &RetrievalConfig,
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        Ok(Self {
            chunker: Chunker::new(config.chunk_size, config.chunk_overlap)?,
            embedder,
            index,
            store: Arc::new(DocumentStore::new()),
            observer: Arc::new(NoopObserver),
            retry: RetryPolicy::from_config(config)?,
            batch_size: config.embed_batch_size.max(1),
        })
    }

    /// Attach a lifecycle observer
    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The document registry backing this retriever
    pub fn store(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Number of records currently indexed
    pub async fn indexed_records(&self) -> usize {
        self.index.len().await
    }

    /// Ingest a document: chunk, embed, and index it.
    ///
    /// Transient embedding failures are retried with backoff. On any
    /// terminal failure, or when `cancel` fires between batches, every
    /// record already written for this document is removed and the
    /// document ends in the `Failed` state.
    pub async fn ingest(
        &self,
        document: Document,
        cancel: CancellationToken,
    ) -> Result<IngestReceipt> {
        let document_id = document.id;
        let filename = document.filename().map(str::to_string);

        self.store.insert(document.clone()).await;
        self.transition(document_id, IngestState::Uploaded).await;

        match self.ingest_inner(&document, filename.as_deref(), &cancel).await {
            Ok(chunk_count) => {
                self.store.set_chunk_count(document_id, chunk_count).await;
                self.transition(document_id, IngestState::Indexed).await;
                tracing::info!(%document_id, chunk_count, "document indexed");
                Ok(IngestReceipt {
                    document_id,
                    chunk_count,
                    state: IngestState::Indexed,
                })
            }
            Err(err) => {
                // Roll back partial writes so no chunk of this document
                // remains queryable
                match self.index.delete_by_document(document_id).await {
                    Ok(removed) => {
                        tracing::warn!(%document_id, removed, "ingest failed: {err}")
                    }
                    Err(cleanup_err) => {
                        tracing::error!(%document_id, "ingest rollback failed: {cleanup_err}")
                    }
                }
                self.transition(document_id, IngestState::Failed).await;
                Err(err)
            }
        }
    }

    async fn ingest_inner(
        &self,
        document: &Document,
        filename: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        self.transition(document.id, IngestState::Chunking).await;
        let chunks = self.chunker.split(document);
        tracing::debug!(document_id = %document.id, chunks = chunks.len(), "document chunked");

        self.transition(document.id, IngestState::Embedding).await;
        for batch in chunks.chunks(self.batch_size) {
            if cancel.is_cancelled() {
                return Err(RagentError::Cancelled);
            }

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self
                .retry
                .run("embedding batch", || self.embedder.embed_batch(&texts))
                .await?;

            let records: Vec<VectorRecord> = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    let record = VectorRecord::new(chunk, embedding);
                    match filename {
                        Some(name) => record.with_source("filename", name),
                        None => record,
                    }
                })
                .collect();

            self.index.insert_batch(records).await?;
        }

        Ok(chunks.len())
    }

    /// Answer a retrieval query with the most similar indexed chunks.
    ///
    /// An empty index yields an empty context, not an error.
    pub async fn query(&self, query: &RetrievalQuery) -> Result<RetrievedContext> {
        let question = query.question.trim();
        if question.is_empty() {
            return Err(RagentError::InvalidParameter(
                "question must not be empty".to_string(),
            ));
        }

        let embedding = self
            .retry
            .run("query embedding", || self.embedder.embed(question))
            .await?;

        let results = self
            .index
            .search(&embedding, query.top_k, &query.filter)
            .await?;
        tracing::debug!(results = results.len(), top_k = query.top_k, "query served");

        Ok(RetrievedContext { results })
    }

    /// Remove a document and all of its indexed chunks.
    ///
    /// Returns the number of vector records removed.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<u64> {
        // Vectors go first: if the index delete fails the document stays
        // registered instead of leaving orphaned, still-searchable records.
        self.store.get(document_id).await?;
        let removed = self.index.delete_by_document(document_id).await?;
        self.store.remove(document_id).await;
        Ok(removed)
    }

    async fn transition(&self, document_id: Uuid, state: IngestState) {
        self.store.set_state(document_id, state).await;
        self.observer.on_transition(document_id, state);
        tracing::debug!(%document_id, %state, "ingest state");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragent_vector::InMemoryIndex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Deterministic embedder: a text maps to a fixed 4-dim vector, so a
    /// query with a chunk's exact text scores similarity 1.0 against it.
    struct MockEmbedder {
        batch_calls: AtomicU32,
        /// Batch call numbers (1-based) that fail, with the error to return
        fail_calls: Mutex<Vec<(u32, RagentError)>>,
        /// Token cancelled as a side effect of the first batch call
        cancel_after_first: Option<CancellationToken>,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                batch_calls: AtomicU32::new(0),
                fail_calls: Mutex::new(Vec::new()),
                cancel_after_first: None,
            }
        }

        fn failing_on(calls: Vec<(u32, RagentError)>) -> Self {
            let embedder = Self::new();
            *embedder.fail_calls.lock().unwrap() = calls;
            embedder
        }

        fn vector_for(text: &str) -> Vec<f32> {
            let sum: u32 = text.bytes().map(u32::from).sum();
            vec![
                (sum % 97) as f32 + 1.0,
                (text.len() % 31) as f32 + 1.0,
                text.bytes().next().unwrap_or(1) as f32,
                1.0,
            ]
        }
    }

    #[async_trait]
    impl EmbeddingClient for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(Self::vector_for(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;

            if let Some(token) = &self.cancel_after_first {
                if call == 1 {
                    token.cancel();
                }
            }

            let mut fail_calls = self.fail_calls.lock().unwrap();
            if let Some(pos) = fail_calls.iter().position(|(n, _)| *n == call) {
                let (_, err) = fail_calls.remove(pos);
                return Err(err);
            }

            Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        transitions: Mutex<Vec<IngestState>>,
    }

    impl IngestObserver for RecordingObserver {
        fn on_transition(&self, _document_id: Uuid, state: IngestState) {
            self.transitions.lock().unwrap().push(state);
        }
    }

    fn test_config() -> RetrievalConfig {
        RetrievalConfig {
            chunk_size: 50,
            chunk_overlap: 10,
            embed_batch_size: 1,
            retry_initial_backoff_ms: 1,
            ..RetrievalConfig::default()
        }
    }

    fn retriever_with(embedder: MockEmbedder) -> Retriever {
        Retriever::new(
            &test_config(),
            Arc::new(embedder),
            Arc::new(InMemoryIndex::new()),
        )
        .unwrap()
    }

    fn long_document() -> Document {
        Document::new("the quick brown fox jumps over the lazy dog. ".repeat(5))
            .with_metadata("filename", "fox.txt")
    }

    #[tokio::test]
    async fn test_ingest_then_query_round_trip() {
        let retriever = retriever_with(MockEmbedder::new());
        let doc = long_document();
        let doc_id = doc.id;

        let receipt = retriever.ingest(doc, CancellationToken::new()).await.unwrap();
        assert_eq!(receipt.state, IngestState::Indexed);
        assert!(receipt.chunk_count > 1);
        assert_eq!(retriever.indexed_records().await, receipt.chunk_count);

        let context = retriever
            .query(&RetrievalQuery::new("quick brown fox"))
            .await
            .unwrap();
        assert!(!context.results.is_empty());
        assert!(context.results.iter().all(|r| r.chunk.document_id == doc_id));
        assert_eq!(context.sources(), vec!["fox.txt"]);
    }

    #[tokio::test]
    async fn test_observer_sees_full_lifecycle() {
        let observer = Arc::new(RecordingObserver::default());
        let retriever =
            retriever_with(MockEmbedder::new())
                .with_observer(Arc::clone(&observer) as Arc<dyn IngestObserver>);

        retriever
            .ingest(long_document(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            *observer.transitions.lock().unwrap(),
            vec![
                IngestState::Uploaded,
                IngestState::Chunking,
                IngestState::Embedding,
                IngestState::Indexed,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_ingest_leaves_nothing_queryable() {
        let observer = Arc::new(RecordingObserver::default());
        let embedder = MockEmbedder::failing_on(vec![(
            2,
            RagentError::EmbeddingFailed("bad batch".to_string()),
        )]);
        let retriever = retriever_with(embedder)
            .with_observer(Arc::clone(&observer) as Arc<dyn IngestObserver>);
        let doc = long_document();
        let doc_id = doc.id;

        let err = retriever
            .ingest(doc, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RagentError::EmbeddingFailed(_)));

        // First batch was inserted, then rolled back
        assert_eq!(retriever.indexed_records().await, 0);
        assert_eq!(
            retriever.store().get(doc_id).await.unwrap().state,
            IngestState::Failed
        );
        assert_eq!(
            observer.transitions.lock().unwrap().last(),
            Some(&IngestState::Failed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_embedding_failures_are_retried() {
        let embedder = MockEmbedder::failing_on(vec![
            (1, RagentError::RateLimited("slow down".to_string())),
            (2, RagentError::ServiceUnavailable("overloaded".to_string())),
        ]);
        let retriever = retriever_with(embedder);

        let receipt = retriever
            .ingest(long_document(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(receipt.state, IngestState::Indexed);
        assert_eq!(retriever.indexed_records().await, receipt.chunk_count);
    }

    #[tokio::test]
    async fn test_cancellation_rolls_back() {
        let cancel = CancellationToken::new();
        let mut embedder = MockEmbedder::new();
        embedder.cancel_after_first = Some(cancel.clone());
        let retriever = retriever_with(embedder);
        let doc = long_document();
        let doc_id = doc.id;

        let err = retriever.ingest(doc, cancel).await.unwrap_err();
        assert!(matches!(err, RagentError::Cancelled));

        assert_eq!(retriever.indexed_records().await, 0);
        assert_eq!(
            retriever.store().get(doc_id).await.unwrap().state,
            IngestState::Failed
        );
    }

    #[tokio::test]
    async fn test_empty_document_indexes_zero_chunks() {
        let retriever = retriever_with(MockEmbedder::new());

        let receipt = retriever
            .ingest(Document::new(""), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(receipt.chunk_count, 0);
        assert_eq!(receipt.state, IngestState::Indexed);
    }

    #[tokio::test]
    async fn test_query_requires_question() {
        let retriever = retriever_with(MockEmbedder::new());

        let err = retriever
            .query(&RetrievalQuery::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, RagentError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_query_empty_index_returns_empty_context() {
        let retriever = retriever_with(MockEmbedder::new());

        let context = retriever
            .query(&RetrievalQuery::new("anything"))
            .await
            .unwrap();
        assert!(context.results.is_empty());
        assert!(context.sources().is_empty());
    }

    #[tokio::test]
    async fn test_delete_document_removes_vectors() {
        let retriever = retriever_with(MockEmbedder::new());
        let doc = long_document();
        let doc_id = doc.id;

        let receipt = retriever.ingest(doc, CancellationToken::new()).await.unwrap();
        let removed = retriever.delete_document(doc_id).await.unwrap();
        assert_eq!(removed as usize, receipt.chunk_count);
        assert_eq!(retriever.indexed_records().await, 0);

        let err = retriever.delete_document(doc_id).await.unwrap_err();
        assert!(matches!(err, RagentError::NotFound(_)));
    }

    /// Index whose document-level delete always fails; everything else
    /// delegates to the in-memory index.
    struct BrokenDeleteIndex(InMemoryIndex);

    #[async_trait]
    impl VectorStore for BrokenDeleteIndex {
        async fn insert(&self, record: VectorRecord) -> Result<()> {
            self.0.insert(record).await
        }

        async fn insert_batch(&self, records: Vec<VectorRecord>) -> Result<()> {
            self.0.insert_batch(records).await
        }

        async fn search(
            &self,
            query: &[f32],
            top_k: usize,
            filter: &ragent_core::SearchFilter,
        ) -> Result<Vec<ragent_core::ScoredChunk>> {
            self.0.search(query, top_k, filter).await
        }

        async fn delete(&self, chunk_id: Uuid) -> Result<()> {
            self.0.delete(chunk_id).await
        }

        async fn delete_by_document(&self, _document_id: Uuid) -> Result<u64> {
            Err(RagentError::ServiceUnavailable("index offline".to_string()))
        }

        async fn len(&self) -> usize {
            self.0.len().await
        }

        fn name(&self) -> &str {
            "broken-delete"
        }
    }

    #[tokio::test]
    async fn test_failed_vector_delete_keeps_document_registered() {
        let retriever = Retriever::new(
            &test_config(),
            Arc::new(MockEmbedder::new()),
            Arc::new(BrokenDeleteIndex(InMemoryIndex::new())),
        )
        .unwrap();
        let doc = long_document();
        let doc_id = doc.id;

        retriever.ingest(doc, CancellationToken::new()).await.unwrap();

        let err = retriever.delete_document(doc_id).await.unwrap_err();
        assert!(matches!(err, RagentError::ServiceUnavailable(_)));

        // The document must still be registered while its vectors remain
        assert!(retriever.store().get(doc_id).await.is_ok());
        assert!(retriever.indexed_records().await > 0);
    }
}
