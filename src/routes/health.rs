// src/routes/health.rs
//! Liveness endpoint for the monitor itself.
//!
//! `GET /health` always answers 200 while the process is serving. The body
//! also carries the backend connection state last recorded by the health
//! cycle, so orchestrators can tell "monitor up, backend down" apart.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;
use crate::models::ConnectionState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: ConnectionState,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state.snapshot.borrow().connection;
    Json(HealthResponse {
        status: "ok",
        backend,
    })
}

/// Subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
