//! HTTP server for ingestion and retrieval.
//!
//! Every route is scoped to a tenant taken from the path. The reserved
//! tenant `_global` addresses documents that belong to no profile.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/tenants` | Tenants with stored uploads |
//! | `POST`   | `/tenants/{tenant}/documents` | Ingest one document with explicit metadata |
//! | `GET`    | `/tenants/{tenant}/documents` | List document summaries |
//! | `DELETE` | `/tenants/{tenant}/documents/{id}` | Delete one document |
//! | `POST`   | `/tenants/{tenant}/uploads` | Persist, segment, and index a raw upload |
//! | `DELETE` | `/tenants/{tenant}/sources/{source}` | Delete an upload and its documents |
//! | `DELETE` | `/tenants/{tenant}` | Delete all uploads and empty the index |
//! | `POST`   | `/tenants/{tenant}/query` | Ranked search |
//! | `GET`    | `/tenants/{tenant}/count` | Number of indexed documents |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "top_k must be >= 1" } }
//! ```
//!
//! Error codes: `bad_request` (400), `rehydration_failed` (503),
//! `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use profile_recall_core::models::DocumentSummary;
use profile_recall_core::{
    Category, NewDocument, QueryOptions, RankedResult, RawDocument, RecallError, TenantId,
};

use crate::app::{file_type_for, App, RemoveReport, UploadReport};
use crate::config::Config;

/// Starts the HTTP server on `[server].bind` and runs until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = App::open(config).await?;
    let router = router(app.clone());

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("recall server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    app.close().await;
    tracing::info!("server stopped");
    Ok(())
}

/// Builds the router over a shared [`App`].
pub fn router(app: App) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/tenants", get(handle_list_tenants))
        .route("/tenants/{tenant}", delete(handle_clear_tenant))
        .route(
            "/tenants/{tenant}/documents",
            post(handle_ingest_document).get(handle_list_documents),
        )
        .route("/tenants/{tenant}/documents/{id}", delete(handle_delete_document))
        .route("/tenants/{tenant}/uploads", post(handle_upload))
        .route("/tenants/{tenant}/sources/{*source}", delete(handle_delete_source))
        .route("/tenants/{tenant}/query", post(handle_query))
        .route("/tenants/{tenant}/count", get(handle_count))
        .layer(cors)
        .with_state(app)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<RecallError> for AppError {
    fn from(err: RecallError) -> Self {
        match err {
            RecallError::InvalidInput(msg) => bad_request(msg),
            other if other.is_rehydration() => {
                tracing::warn!(error = %other, "rehydration failed");
                AppError {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    code: "rehydration_failed",
                    message: other.to_string(),
                }
            }
            other => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message: other.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<RecallError>() {
            Ok(recall) => recall.into(),
            Err(other) => {
                tracing::error!(error = %other, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn parse_tenant(raw: &str) -> Result<TenantId, AppError> {
    Ok(raw.parse()?)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tenants ============

#[derive(Serialize)]
struct TenantsResponse {
    tenants: Vec<String>,
}

/// Tenants known to the durable store. Indexes that were never persisted
/// (the global tenant, direct document ingests) are not listed.
async fn handle_list_tenants(State(app): State<App>) -> Result<Json<TenantsResponse>, AppError> {
    let tenants = app.store.list_tenants().await?;
    Ok(Json(TenantsResponse { tenants }))
}

// ============ Documents ============

#[derive(Serialize)]
struct IngestResponse {
    id: String,
}

async fn handle_ingest_document(
    State(app): State<App>,
    Path(tenant): Path<String>,
    body: Result<Json<NewDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let tenant = parse_tenant(&tenant)?;
    let Json(doc) = body?;
    let id = app.engine.ingest_one(&tenant, doc).await?;
    Ok((StatusCode::CREATED, Json(IngestResponse { id })))
}

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_list_documents(
    State(app): State<App>,
    Path(tenant): Path<String>,
) -> Result<Json<ListResponse>, AppError> {
    let tenant = parse_tenant(&tenant)?;
    let documents = app.engine.list(&tenant).await?;
    Ok(Json(ListResponse { documents }))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn handle_delete_document(
    State(app): State<App>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, AppError> {
    let tenant = parse_tenant(&tenant)?;
    let deleted = app.engine.delete_one(&tenant, &id).await;
    Ok(Json(DeleteResponse { deleted }))
}

// ============ Uploads and sources ============

#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    content: String,
    #[serde(default)]
    file_type: Option<String>,
}

async fn handle_upload(
    State(app): State<App>,
    Path(tenant): Path<String>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UploadReport>), AppError> {
    let tenant = parse_tenant(&tenant)?;
    let Json(req) = body?;
    if req.filename.trim().is_empty() {
        return Err(bad_request("filename must not be empty"));
    }
    let file_type = req
        .file_type
        .or_else(|| file_type_for(&req.filename).map(str::to_string))
        .unwrap_or_else(|| "text/plain".to_string());

    let report = app
        .upload(
            &tenant,
            RawDocument {
                filename: req.filename,
                content: req.content,
                file_type,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn handle_delete_source(
    State(app): State<App>,
    Path((tenant, source)): Path<(String, String)>,
) -> Result<Json<RemoveReport>, AppError> {
    let tenant = parse_tenant(&tenant)?;
    let report = app.remove_source(&tenant, &source).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
struct ClearResponse {
    stored_removed: u64,
}

async fn handle_clear_tenant(
    State(app): State<App>,
    Path(tenant): Path<String>,
) -> Result<Json<ClearResponse>, AppError> {
    let tenant = parse_tenant(&tenant)?;
    let stored_removed = app.purge_tenant(&tenant).await?;
    Ok(Json(ClearResponse { stored_removed }))
}

// ============ Retrieval ============

/// Body of `POST /tenants/{tenant}/query`. Omitted options fall back to
/// the server's `[retrieval]` settings.
#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    min_score: Option<f64>,
}

impl QueryRequest {
    fn options(&self, config: &Config) -> QueryOptions {
        let mut opts = config.retrieval.query_options();
        if let Some(k) = self.top_k {
            opts = opts.with_top_k(k);
        }
        if let Some(min) = self.min_score {
            opts = opts.with_min_score(min);
        }
        if let Some(category) = self.category {
            opts = opts.with_category(category);
        }
        opts
    }
}

#[derive(Serialize)]
struct QueryResponse {
    results: Vec<RankedResult>,
}

async fn handle_query(
    State(app): State<App>,
    Path(tenant): Path<String>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let tenant = parse_tenant(&tenant)?;
    let Json(req) = body?;
    let opts = req.options(&app.config);
    let results = app.engine.query(&tenant, &req.query, &opts).await?;
    Ok(Json(QueryResponse { results }))
}

#[derive(Serialize)]
struct CountResponse {
    tenant: String,
    count: usize,
}

async fn handle_count(
    State(app): State<App>,
    Path(tenant): Path<String>,
) -> Result<Json<CountResponse>, AppError> {
    let tenant = parse_tenant(&tenant)?;
    let count = app.engine.count(&tenant).await?;
    Ok(Json(CountResponse {
        tenant: tenant.to_string(),
        count,
    }))
}
