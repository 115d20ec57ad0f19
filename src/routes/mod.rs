//! HTTP gateway exposing the dashboard snapshot to the presentation layer.
//!
//! Everything served here is read-only. Handlers only ever borrow the
//! `watch` receiver; the poller remains the sole writer.

use axum::Router;
use tokio::sync::watch;

use crate::state::DashboardSnapshot;

mod dashboard;
mod health;

// ---

/// Shared router state: a reader on the poller's snapshot channel.
#[derive(Debug, Clone)]
pub struct AppState {
    pub snapshot: watch::Receiver<DashboardSnapshot>,
}

pub fn router(snapshot: watch::Receiver<DashboardSnapshot>) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(health::router())
        .with_state(AppState { snapshot })
}
