//! RAGent API - REST server
//!
//! HTTP endpoints for uploading documents and answering grounded queries
//! over the indexed corpus. Swagger UI is served at `/swagger-ui`.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

#[cfg(feature = "test-utils")]
pub mod testing;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use ragent_core::config::ServerConfig;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "test-utils")]
pub use testing::create_router_for_testing;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::query::query_handler,
        handlers::documents::list_documents,
        handlers::documents::get_document,
        handlers::documents::upload_document,
        handlers::documents::delete_document,
    ),
    components(schemas(
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::MetricsResponse,
        handlers::query::QueryRequest,
        handlers::query::QueryResponse,
        handlers::query::RetrievedChunk,
        handlers::documents::DocumentInfo,
        handlers::documents::DocumentListResponse,
        handlers::documents::UploadDocumentResponse,
        handlers::documents::DeleteDocumentResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "documents", description = "Document ingest and management"),
        (name = "query", description = "Grounded question answering")
    )
)]
struct ApiDoc;

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if !config.cors_enabled || config.cors_origins.is_empty() {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/v1", routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
