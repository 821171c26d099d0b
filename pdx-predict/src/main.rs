//! pdx-predict - Parkinson's screening microservice
//!
//! Accepts voice recordings and brain scans over HTTP, scores them with
//! pretrained classifiers, fuses the per-modality decisions, and renders
//! PDF screening reports.

use anyhow::Result;
use pdx_common::Config;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pdx_predict::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting pdx-predict (Parkinson's screening) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration: environment over TOML over defaults.
    let config = Config::resolve();
    info!("Models directory: {}", config.models_dir.display());
    info!("Media directory: {}", config.media_dir.display());

    // Reports must be writable; models may legitimately be absent.
    config
        .ensure_directories()
        .map_err(|e| anyhow::anyhow!("Failed to initialize directories: {}", e))?;
    if !config.models_dir.is_dir() {
        tracing::warn!(
            "Models directory missing, all predictors will report model not found: {}",
            config.models_dir.display()
        );
    }

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config);
    let app = pdx_predict::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
