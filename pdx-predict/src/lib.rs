//! pdx-predict library interface
//!
//! Exposes the screening pipeline, model registry, and HTTP API for
//! integration testing.

pub mod api;
pub mod audio;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod predict;
pub mod report;

pub use crate::error::{ApiError, ApiResult};

use crate::models::ModelRegistry;
use axum::Router;
use chrono::{DateTime, Utc};
use pdx_common::Config;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved service configuration
    pub config: Config,
    /// Lazily loaded model artifacts, shared across requests
    pub registry: Arc<ModelRegistry>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(ModelRegistry::new(config.models_dir.clone()));
        Self {
            config,
            registry,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::report_routes())
        .merge(api::spectrogram_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
