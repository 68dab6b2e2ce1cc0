//! Retrieval query handlers

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use ragent_core::RetrievalQuery;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Query request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// User's question
    #[schema(example = "What is the vacation policy?")]
    pub question: String,

    /// Maximum number of chunks to retrieve
    #[serde(default = "default_top_k")]
    #[schema(example = 5, default = 5)]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

/// A retrieved chunk with its score
#[derive(Debug, Serialize, ToSchema)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,

    /// Source filename
    #[schema(example = "handbook.pdf")]
    pub source: Option<String>,

    /// Similarity score
    #[schema(example = 0.92)]
    pub score: f32,
}

/// Query response body
#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,

    /// Source filenames, deduplicated in retrieval order
    pub sources: Vec<String>,

    /// Retrieved context chunks
    pub results: Vec<RetrievedChunk>,

    /// Processing time in milliseconds
    #[schema(example = 1250)]
    pub processing_time_ms: u64,
}

/// Answer a question grounded in the indexed documents
#[utoipa::path(
    post,
    path = "/api/v1/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query successful", body = QueryResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 500, description = "Internal error", body = crate::error::ApiError)
    )
)]
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();
    let start = std::time::Instant::now();

    let query = RetrievalQuery::new(req.question.clone()).with_top_k(req.top_k);
    let context = state.retriever.query(&query).await?;
    let answer = state.assembler.answer(&req.question, &context).await?;

    let results = context
        .results
        .iter()
        .map(|r| RetrievedChunk {
            text: r.chunk.text.clone(),
            source: r.source.get("filename").cloned(),
            score: r.score,
        })
        .collect();

    let response = QueryResponse {
        answer: answer.answer,
        sources: answer.sources,
        results,
        processing_time_ms: start.elapsed().as_millis() as u64,
    };

    Ok((StatusCode::OK, Json(response)))
}
