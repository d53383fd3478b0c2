use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /api/stats
///
/// Entry counts of the engine stores. Counters and challenges that have
/// expired but were not touched since are still included.
pub async fn get_stats(State(state): State<SharedState>) -> Json<Value> {
    let stats = state.engine.stats();
    let engine_config = state.engine.config();

    Json(json!({
        "captchas": stats.captchas,
        "counters": stats.counters,
        "challenges": stats.challenges,
        "window_policy": engine_config.window_policy,
        "uptime_secs": state.start_time.elapsed().as_secs()
    }))
}
