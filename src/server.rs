//! JSON HTTP server.
//!
//! Exposes the query and catalog interfaces consumed by a web frontend or
//! any other HTTP client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Answer a question; returns answer, sources, session id |
//! | `GET`  | `/courses` | Course count and titles |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Internal failures (embedding or model calls that exhausted their
//! retries) are logged with full detail via `tracing` and surfaced with a
//! generic message — provider error bodies never reach the client.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! frontends.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::assistant::Assistant;
use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::generator::ClaudeModel;
use crate::migrate;
use crate::models::SourceRef;
use crate::store::VectorStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
}

/// Build the collaborators from config and start the server. This is the
/// standard entry point used by the `lectern serve` command.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let embedder = create_embedder(&config.embedding)?;
    let model = Arc::new(ClaudeModel::new(&config.generator)?);

    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    let store = Arc::new(VectorStore::new(pool, embedder));

    let assistant = Arc::new(Assistant::new(config.clone(), store, model));
    serve(assistant, &config.server.bind).await
}

/// Start the server around an existing [`Assistant`]. Split out so tests
/// can drive the HTTP surface with fake collaborators.
pub async fn serve(assistant: Arc<Assistant>, bind_addr: &str) -> anyhow::Result<()> {
    let state = AppState { assistant };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/query", post(handle_query))
        .route("/courses", get(handle_courses))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("lectern server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
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

/// Internal failure: details go to the log, a generic message to the client.
fn internal_error(context: &str, err: anyhow::Error) -> AppError {
    tracing::error!(context, error = ?err, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{} failed — see server logs", context),
    }
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<SourceRef>,
    session_id: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let outcome = state
        .assistant
        .query(&req.query, req.session_id)
        .await
        .map_err(|e| internal_error("query", e))?;

    Ok(Json(QueryResponse {
        answer: outcome.answer,
        sources: outcome.sources,
        session_id: outcome.session_id,
    }))
}

// ============ GET /courses ============

#[derive(Serialize)]
struct CoursesResponse {
    total_courses: i64,
    course_titles: Vec<String>,
}

async fn handle_courses(
    State(state): State<AppState>,
) -> Result<Json<CoursesResponse>, AppError> {
    let catalog = state
        .assistant
        .catalog()
        .await
        .map_err(|e| internal_error("courses", e))?;

    Ok(Json(CoursesResponse {
        total_courses: catalog.total_courses,
        course_titles: catalog.course_titles,
    }))
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
