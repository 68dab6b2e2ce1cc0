//! RAGent API Server
//!
//! REST server for document ingest and grounded question answering.

use ragent_api::{create_router, state::AppState};
use ragent_core::config::AppConfig;
use ragent_rag::{create_llm_client, AnswerAssembler, Retriever};
use ragent_vector::{create_embedding_client, EmbeddingClient, InMemoryIndex};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before logging so the level is honored
    let config = AppConfig::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "ragent_api={},tower_http=info",
            config.logging.level
        ))
    });
    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Wire the pipeline: hosted embedder and LLM over an in-memory index
    let embedder: Arc<dyn EmbeddingClient> = Arc::from(create_embedding_client(&config.llm)?);
    let llm = Arc::from(create_llm_client(&config.llm)?);
    let index = Arc::new(InMemoryIndex::new());

    let retriever = Arc::new(Retriever::new(&config.retrieval, embedder, index)?);
    let assembler = Arc::new(AnswerAssembler::new(
        llm,
        config.retrieval.max_context_length,
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, retriever, assembler));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("RAGent API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
