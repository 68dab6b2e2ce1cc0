//! Document management handlers

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ragent_core::{Document, RagentError};
use ragent_rag::StoredDocument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Document information
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentInfo {
    /// Document UUID
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    /// Original filename
    #[schema(example = "handbook.pdf")]
    pub filename: Option<String>,

    /// Ingest lifecycle state
    #[schema(example = "indexed")]
    pub state: String,

    /// Number of chunks produced
    #[schema(example = 45)]
    pub chunk_count: usize,

    /// Upload timestamp
    pub created_at: String,
}

impl From<StoredDocument> for DocumentInfo {
    fn from(stored: StoredDocument) -> Self {
        Self {
            id: stored.document.id,
            filename: stored.document.filename().map(str::to_string),
            state: stored.state.to_string(),
            chunk_count: stored.chunk_count,
            created_at: stored.document.created_at.to_rfc3339(),
        }
    }
}

/// Document list response
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentListResponse {
    /// List of documents
    pub documents: Vec<DocumentInfo>,

    /// Total count
    pub total: usize,
}

/// List uploaded documents
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    tag = "documents",
    responses(
        (status = 200, description = "Document list", body = DocumentListResponse)
    )
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let mut documents: Vec<DocumentInfo> = state
        .retriever
        .store()
        .list()
        .await
        .into_iter()
        .map(DocumentInfo::from)
        .collect();
    documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let response = DocumentListResponse {
        total: documents.len(),
        documents,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Get single document by ID
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(
        ("id" = Uuid, Path, description = "Document UUID")
    ),
    responses(
        (status = 200, description = "Document details", body = DocumentInfo),
        (status = 404, description = "Document not found", body = crate::error::ApiError)
    )
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let stored = state.retriever.store().get(id).await?;
    Ok((StatusCode::OK, Json(DocumentInfo::from(stored))))
}

/// Upload query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct UploadParams {
    /// Original filename, used to pick a parser and label sources
    pub filename: String,
}

/// Upload document response
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadDocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub chunk_count: usize,
    pub state: String,
}

/// Upload a document as raw bytes and ingest it.
///
/// The file type is inferred from the filename extension. The response
/// returns once the document is fully indexed or ingest has failed.
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "documents",
    params(UploadParams),
    request_body(content = String, description = "Raw file bytes", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Document ingested", body = UploadDocumentResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError)
    )
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if params.filename.trim().is_empty() {
        return Err(AppError::BadRequest("filename cannot be empty".to_string()));
    }
    if body.is_empty() {
        return Err(AppError::BadRequest("file body cannot be empty".to_string()));
    }

    let parsed = state
        .parsers
        .parse_bytes(&body, &params.filename)
        .map_err(RagentError::from)?;

    let document = Document::new(parsed.content)
        .with_metadata("filename", params.filename.clone())
        .with_metadata("file_type", parsed.file_type.to_string());

    let receipt = state
        .retriever
        .ingest(document, CancellationToken::new())
        .await?;
    tracing::info!(document_id = %receipt.document_id, chunks = receipt.chunk_count, "document ingested");

    let response = UploadDocumentResponse {
        id: receipt.document_id,
        filename: params.filename,
        chunk_count: receipt.chunk_count,
        state: receipt.state.to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Delete document response
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteDocumentResponse {
    pub id: Uuid,
    pub removed_chunks: u64,
}

/// Delete a document and its indexed chunks
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(
        ("id" = Uuid, Path, description = "Document UUID")
    ),
    responses(
        (status = 200, description = "Document deleted", body = DeleteDocumentResponse),
        (status = 404, description = "Document not found", body = crate::error::ApiError)
    )
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let removed_chunks = state.retriever.delete_document(id).await?;
    tracing::info!(document_id = %id, removed_chunks, "document deleted");

    Ok((
        StatusCode::OK,
        Json(DeleteDocumentResponse {
            id,
            removed_chunks,
        }),
    ))
}
