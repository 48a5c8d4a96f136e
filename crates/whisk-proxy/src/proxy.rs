//! HTTP surface: `POST /init`, `POST /run`, `GET /health`.
//!
//! Bodies are read raw and parsed by hand so malformed requests map to the
//! platform's canned errors instead of the framework's default rejections.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

use crate::codec;
use crate::context::InvocationContext;
use crate::error::ProxyError;
use crate::lifecycle::{ActionLifecycle, InitValue};

pub const INIT_SUCCESS: &str = "Function init success";

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ActionLifecycle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/init", post(init))
        .route("/run", post(run))
        .route("/health", get(health))
        .with_state(state)
}

async fn init(State(state): State<AppState>, body: String) -> Response {
    match init_inner(&state, &body).await {
        Ok(()) => codec::envelope(StatusCode::OK, codec::RESPONSE_SUCCESS, INIT_SUCCESS),
        Err(e) => {
            tracing::warn!(error = %e, "Init rejected");
            e.into_response()
        }
    }
}

async fn init_inner(state: &AppState, body: &str) -> Result<(), ProxyError> {
    // Init is one-shot regardless of payload: an occupied slot rejects the
    // call before the body is even parsed, so a repeated init with a
    // malformed body still answers AlreadyInitialized. The slot check is
    // re-run under the write lock inside `init`.
    if state.lifecycle.initialized().await {
        return Err(ProxyError::AlreadyInitialized);
    }

    let payload: Value =
        serde_json::from_str(body).map_err(|_| ProxyError::ArtifactLoadFailed)?;

    let value = payload
        .get("value")
        .cloned()
        .ok_or(ProxyError::ArtifactLoadFailed)?;
    let value: InitValue =
        serde_json::from_value(value).map_err(|_| ProxyError::MissingEntryPoint)?;

    state.lifecycle.init(value).await
}

async fn run(State(state): State<AppState>, body: String) -> Response {
    let outcome = run_inner(&state, &body).await;

    // Hard contract: the marker delimits this activation's log output,
    // success or error, before the response goes out.
    codec::end_of_activation();

    match outcome {
        Ok(result) => codec::raw(StatusCode::OK, result),
        Err(e) => {
            tracing::warn!(error = %e, "Run rejected");
            e.into_response()
        }
    }
}

async fn run_inner(state: &AppState, body: &str) -> Result<String, ProxyError> {
    let payload: Value = serde_json::from_str(body).map_err(|_| ProxyError::InvalidInput)?;

    // The payload forwarded to the action is the non-null `value` object
    let value = match payload.get("value") {
        Some(v @ Value::Object(_)) => v.clone(),
        _ => return Err(ProxyError::InvalidInput),
    };

    let ctx = InvocationContext::from_request(&payload);
    state.lifecycle.run(value, &ctx).await
}

async fn health(State(state): State<AppState>) -> Response {
    let body = json!({
        "status": "ok",
        "initialized": state.lifecycle.initialized().await,
    });
    codec::raw(StatusCode::OK, body.to_string())
}
