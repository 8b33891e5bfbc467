//! HTTP relay server.
//!
//! Exposes the worker invocation pipeline over a small JSON API. Each
//! `POST /chat` request launches one worker process, waits for it to
//! terminate, demultiplexes its stdout, and returns exactly one response.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Run the worker for a `{key, query}` request |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! | Condition | Body | Status |
//! |-----------|------|--------|
//! | Malformed JSON body | `{"error"}` | 400 |
//! | Missing/empty `key` or `query` | `{"error"}` | 400 |
//! | Worker could not be started | `{"error"}` | 500 |
//! | No `{`-prefixed output line | `{"error","logs","raw"}` | 500 |
//! | Result line not a JSON object | `{"error","logs","raw"}` | 500 |
//! | Panic anywhere in the handler | `{"error":"Server crashed"}` | 500 |
//!
//! Validation happens before any process is spawned. Worker stderr is
//! logged server-side and never forwarded to the client.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients calling the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::reply::{assemble, Reply};
use crate::worker::{EnvSnapshot, WorkerInvocation};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    /// Application configuration (wrapped in `Arc` for cheap cloning across handlers).
    config: Arc<Config>,
    /// Environment snapshot handed to every worker invocation.
    env: EnvSnapshot,
}

/// Starts the relay HTTP server.
///
/// Binds to the address configured in `[server].bind` and serves until the
/// process is terminated. The worker environment is snapshotted once here
/// and reused for every invocation.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()), EnvSnapshot::current());

    info!(bind = %bind_addr, "relay server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router. Split out from [`run_server`] so integration tests can
/// drive the handlers in-process without binding a socket.
pub fn router(config: Arc<Config>, env: EnvSnapshot) -> Router {
    let state = AppState { config, env };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

// ============ Error response ============

/// JSON error body. `logs` and `raw` are attached only on the two
/// worker-output failure shapes.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

/// Internal failure type that converts into an HTTP response.
struct ChatError {
    status: StatusCode,
    body: ErrorBody,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Constructs a 400 validation error.
fn bad_request(message: impl Into<String>) -> ChatError {
    ChatError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorBody {
            error: message.into(),
            logs: None,
            raw: None,
        },
    }
}

/// Constructs the 500 returned when the worker process cannot be started.
fn process_crash() -> ChatError {
    ChatError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorBody {
            error: "Failed to launch worker process".to_string(),
            logs: None,
            raw: None,
        },
    }
}

/// Constructs a 500 carrying worker diagnostics (logs + raw output).
fn worker_output_error(message: &str, logs: Vec<String>, raw: String) -> ChatError {
    ChatError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorBody {
            error: message.to_string(),
            logs: Some(logs),
            raw: Some(raw),
        },
    }
}

/// Top-level panic guard: anything uncaught in the handling path becomes a
/// generic server-failure response instead of reaching the transport layer
/// unshaped.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(detail = %detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "Server crashed".to_string(),
            logs: None,
            raw: None,
        }),
    )
        .into_response()
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

/// Handler for `POST /chat`.
///
/// Validates the `{key, query}` body, runs one worker invocation, and maps
/// the assembled reply to the wire contract. Exactly one terminal response
/// per request.
async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ChatError> {
    let Json(body) = payload.map_err(|_| bad_request("Invalid JSON body"))?;

    let key = non_empty_str(&body, "key");
    let query = non_empty_str(&body, "query");
    let (Some(key), Some(query)) = (key, query) else {
        return Err(bad_request("Missing key or query"));
    };

    let invocation = WorkerInvocation::new(&state.config.worker, key, query, state.env.clone());
    info!(worker = %invocation.program(), query_len = query.len(), "running worker invocation");
    let output = invocation.run().await.map_err(|e| {
        error!(error = %e, "worker spawn failed");
        process_crash()
    })?;

    match assemble(&output.stdout) {
        Reply::Success(map) => Ok(Json(Value::Object(map)).into_response()),
        Reply::NoPayload { logs, raw } => Err(worker_output_error(
            "No valid JSON output from worker.",
            logs,
            raw,
        )),
        Reply::MalformedPayload { logs, raw } => Err(worker_output_error(
            "Failed to parse JSON output.",
            logs,
            raw,
        )),
    }
}

/// A required non-empty string field, if present and well-typed.
fn non_empty_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
