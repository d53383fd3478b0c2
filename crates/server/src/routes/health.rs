use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /api/health
///
/// Returns the current health status, including uptime and version.
pub async fn health_check(State(state): State<SharedState>) -> Json<Value> {
    let uptime = state.start_time.elapsed().as_secs();

    Json(json!({
        "status": "healthy",
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": uptime,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
