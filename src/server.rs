//! HTTP server for the chat and ingestion endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | One user turn: `{session_id, message, email?, phone?}` → `{reply}` |
//! | `POST` | `/ingest` | Index raw text: `{text, source}` |
//! | `POST` | `/update-website` | Re-scrape the website and re-index if it changed |
//! | `POST` | `/upload-pdf` | Multipart upload, field `file` |
//! | `GET`  | `/health` | Health check |
//!
//! Ingestion endpoints always answer 200 with `{status, message}`; only a
//! malformed chat request is a 400:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app::AppServices;
use crate::chat::{ChatError, ChatReply, ChatRequest};
use crate::config::Config;
use crate::ingest::{IngestOutcome, IngestStatus};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Connect, build services, and serve on `[server].bind` until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = AppServices::from_config(config).await?;
    let listener = TcpListener::bind(&config.server.bind).await?;
    serve(listener, services).await
}

/// Serve `services` on an already-bound listener.
pub async fn serve(listener: TcpListener, services: AppServices) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "support desk listening");
    axum::serve(listener, router(services)).await?;
    Ok(())
}

pub fn router(services: AppServices) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/ingest", post(handle_ingest))
        .route("/update-website", post(handle_update_website))
        .route("/upload-pdf", post(handle_upload_pdf))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(services)
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(msg) => bad_request(msg),
        }
    }
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

// ============ POST /chat ============

async fn handle_chat(
    State(services): State<AppServices>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = services.chat.handle(request).await?;
    Ok(Json(reply))
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestRequest {
    text: String,
    #[serde(default = "default_ingest_source")]
    source: String,
}

fn default_ingest_source() -> String {
    "api".to_string()
}

async fn handle_ingest(
    State(services): State<AppServices>,
    Json(request): Json<IngestRequest>,
) -> Json<IngestOutcome> {
    Json(services.ingest.ingest_text(&request.text, &request.source).await)
}

// ============ POST /update-website ============

async fn handle_update_website(State(services): State<AppServices>) -> Json<IngestOutcome> {
    Json(services.ingest.refresh_website().await)
}

// ============ POST /upload-pdf ============

async fn handle_upload_pdf(
    State(services): State<AppServices>,
    mut multipart: Multipart,
) -> Json<IngestOutcome> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Json(upload_error(format!("Invalid upload: {}", e))),
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Json(upload_error(format!("Invalid upload: {}", e))),
        };
        return Json(services.ingest.ingest_upload(&filename, &bytes).await);
    }
    Json(upload_error("No file provided."))
}

fn upload_error(message: impl Into<String>) -> IngestOutcome {
    IngestOutcome {
        status: IngestStatus::Error,
        message: message.into(),
    }
}
