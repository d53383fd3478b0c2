use anyhow::Result;
use powgate_common::AppConfig;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    // Parse command-line args for config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/powgate.yaml".to_string());

    info!(config_path = %config_path, "starting powgate");

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(config_path = %config_path, error = %e, "failed to load configuration");
            return Err(e);
        }
    };

    let engine = powgate_server::engine_from_config(&config)?;
    let state = powgate_server::new_shared_state(engine);

    powgate_server::run_server(state, &config.server.listen, shutdown_signal()).await?;

    info!("powgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
