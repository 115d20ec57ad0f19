use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use crate::junctions::{self, Junction, DEFAULT_JUNCTION};
use crate::metrics::DerivedMetrics;
use crate::state::DashboardSnapshot;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/dashboard", get(handler))
}

/// Query parameters for `GET /dashboard`.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    junction: Option<u8>,
}

#[derive(Debug, Serialize)]
struct JunctionView {
    id: u8,
    name: &'static str,
    label: String,
}

impl From<&Junction> for JunctionView {
    fn from(j: &Junction) -> Self {
        JunctionView {
            id: j.id,
            name: j.name,
            label: j.label(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    junction: JunctionView,
    #[serde(flatten)]
    snapshot: DashboardSnapshot,
    metrics: Option<DerivedMetrics>,
    advisory: Option<String>,
}

async fn handler(
    Query(params): Query<DashboardQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // ---
    let id = params.junction.unwrap_or(DEFAULT_JUNCTION);
    let Some(junction) = junctions::find(id) else {
        debug!("GET /dashboard - unknown junction {}", id);
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("Unknown junction {}", id) })),
        )
            .into_response();
    };

    let snapshot = state.snapshot.borrow().clone();
    let metrics = snapshot.derived();
    let advisory = snapshot
        .prediction
        .as_ref()
        .map(|p| junctions::advisory(junction, p));

    debug!("GET /dashboard - junction {} ({:?})", id, snapshot.connection);

    (
        StatusCode::OK,
        Json(DashboardResponse {
            junction: junction.into(),
            snapshot,
            metrics,
            advisory,
        }),
    )
        .into_response()
}
