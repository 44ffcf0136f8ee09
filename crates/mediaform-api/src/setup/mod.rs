//! Application setup and initialization
//!
//! Everything `main` needs to go from a [`Config`] to a running router,
//! kept out of `main.rs` so integration tests can build the same app.

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use mediaform_core::Config;
use mediaform_infra::{init_telemetry, LogFormat};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    init_telemetry(LogFormat::parse(&config.base.log_format))
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.base.environment,
        production = config.is_production(),
        "Configuration loaded and validated successfully"
    );

    let storage = mediaform_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;

    let state = Arc::new(AppState::new(config.clone(), storage));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
