//! HTTP service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Health check (returns version) |
//! | `POST` | `/api/upload?filename=..&wait=bool` | Upload a PDF (raw body) |
//! | `POST` | `/api/agent/chat` | Ask a question: `{"question": ".."}` → `{"answer": ".."}` |
//!
//! Uploads are staged under `[server].staging_dir` and ingested in the
//! background; the response carries the new `doc_id` straight away. With
//! `wait=true` ingestion runs before responding and a failure is a 422.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "document_processing", "message": "Could not process the uploaded document: .." } }
//! ```
//!
//! Error codes: `bad_request` (400), `document_processing` (422),
//! `agent_error` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AgentError, DocumentProcessingError};
use crate::pdf::PdfReader;
use crate::service::Harness;
use crate::staging::StagedUpload;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    harness: Arc<Harness>,
    staging_dir: Arc<PathBuf>,
}

/// Build the router around an existing harness.
pub fn router(harness: Arc<Harness>, staging_dir: PathBuf) -> Router {
    let state = AppState {
        harness,
        staging_dir: Arc::new(staging_dir),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_health))
        .route("/api/upload", post(handle_upload))
        .route("/api/agent/chat", post(handle_chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind `[server].bind` and serve until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let harness = Arc::new(Harness::from_config(config).await?);
    let app = router(harness, config.server.staging_dir.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "docqa listening");
    axum::serve(listener, app).await?;

    Ok(())
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

struct AppError {
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

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

impl From<DocumentProcessingError> for AppError {
    fn from(err: DocumentProcessingError) -> Self {
        AppError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "document_processing",
            message: format!("Could not process the uploaded document: {:#}", err.source),
        }
    }
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "agent_error",
            message: format!("An error occurred in the agent: {:#}", err.0),
        }
    }
}

// ============ GET / ============

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

// ============ POST /api/upload ============

#[derive(Debug, Deserialize)]
struct UploadParams {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    wait: bool,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    doc_id: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<usize>,
}

async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    if body.is_empty() {
        return Err(bad_request("request body must contain the PDF file"));
    }
    if let Some(name) = &params.filename {
        if !name.to_ascii_lowercase().ends_with(".pdf") {
            return Err(bad_request("Only PDF files are supported"));
        }
    }

    let doc_id = Uuid::new_v4().to_string();
    let staged = StagedUpload::write(&state.staging_dir, params.filename.as_deref(), &body)
        .map_err(internal)?;
    tracing::info!(
        %doc_id,
        filename = params.filename.as_deref().unwrap_or("-"),
        bytes = body.len(),
        "upload staged"
    );
    let reader = PdfReader::from_staged(staged);

    if params.wait {
        let report = state.harness.ingest(&doc_id, reader).await?;
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                doc_id,
                message: "Document processed successfully.".to_string(),
                chunks: Some(report.chunks),
            }),
        ));
    }

    // The handle is dropped; the task runs to completion on its own.
    let _ = state.harness.clone().spawn_ingest(doc_id.clone(), reader);
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            doc_id,
            message: "File uploaded; processing has started.".to_string(),
            chunks: None,
        }),
    ))
}

// ============ POST /api/agent/chat ============

#[derive(Debug, Deserialize)]
struct ChatRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let answer = state.harness.ask(&req.question).await?;
    Ok(Json(ChatResponse {
        answer: answer.answer,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let e: AppError = DocumentProcessingError::new("d", anyhow::anyhow!("bad xref")).into();
        assert_eq!(e.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(e.message, "Could not process the uploaded document: bad xref");

        let e: AppError = AgentError(anyhow::anyhow!("down")).into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code, "agent_error");
    }
}
