pub mod routes;
pub mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use powgate_commands::payload::to_defense_levels;
use powgate_common::AppConfig;
use powgate_engine::Engine;
use tower_http::cors::{Any, CorsLayer};

pub use crate::state::SharedState;

pub use state::{AppState, CommandMetrics};

/// Build the Axum router exposing the command API and its diagnostics.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/command", post(routes::command::run_command))
        .route("/api/health", get(routes::health::health_check))
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/metrics", get(routes::metrics::get_metrics))
        .with_state(state)
        .layer(cors)
}

/// Serve the command API on `listen_addr` until `shutdown` resolves.
pub async fn run_server<F>(state: SharedState, listen_addr: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "command API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Convenience function to create a SharedState around an engine.
pub fn new_shared_state(engine: Engine) -> SharedState {
    Arc::new(AppState::new(engine))
}

/// Build the engine described by `config` and register its seed captchas.
pub fn engine_from_config(config: &AppConfig) -> anyhow::Result<Engine> {
    let engine = Engine::new(config.engine);

    for seed in &config.captchas {
        engine
            .register_captcha(
                &seed.id,
                to_defense_levels(&seed.levels),
                Duration::from_secs(seed.duration),
            )
            .map_err(|e| anyhow::anyhow!("captcha '{}': {}", seed.id, e))?;
    }

    tracing::info!(captchas = config.captchas.len(), "engine ready");
    Ok(engine)
}
