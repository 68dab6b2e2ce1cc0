//! Test utilities: a router wired to deterministic in-process stand-ins
//! for the embedding and generation services.

use crate::state::AppState;
use async_trait::async_trait;
use axum::Router;
use ragent_core::config::AppConfig;
use ragent_core::{LlmClient, Result};
use ragent_rag::{AnswerAssembler, Retriever};
use ragent_vector::{EmbeddingClient, InMemoryIndex};
use std::sync::Arc;

/// Deterministic embedder: the same text always maps to the same vector,
/// so a query repeating a chunk's text retrieves that chunk first.
pub struct TestEmbedder;

impl TestEmbedder {
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
impl EmbeddingClient for TestEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        4
    }
}

/// LLM stub returning a fixed answer
pub struct TestLlm;

#[async_trait]
impl LlmClient for TestLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok("test answer".to_string())
    }
}

/// Build application state over the test stand-ins
pub fn test_state() -> Arc<AppState> {
    let config = AppConfig::default();
    let retriever = Retriever::new(
        &config.retrieval,
        Arc::new(TestEmbedder),
        Arc::new(InMemoryIndex::new()),
    )
    .expect("default retrieval config is valid");
    let assembler = AnswerAssembler::new(
        Arc::new(TestLlm),
        config.retrieval.max_context_length,
    );

    Arc::new(AppState::new(config, Arc::new(retriever), Arc::new(assembler)))
}

/// Build a router backed by test stand-ins
pub fn create_router_for_testing() -> Router {
    crate::create_router(test_state())
}
