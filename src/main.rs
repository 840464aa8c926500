use anyhow::Result;
use axum::{http::Method, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

#[cfg(test)]
mod test_support;

use error::AppError;
use models::Workbook;
use services::excel::WorkbookLoader;
use services::explore::{DistributionSettings, Explorer};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;
    tracing::info!(
        "Starting sheet browser on workbook {} (advanced sheet: {})",
        config.workbook_path.display(),
        config.advanced_sheet
    );

    // The workbook is read once and shared read-only by every request
    let loader = WorkbookLoader::new();
    let workbook = loader.load(&config.workbook_path).map_err(|e| {
        tracing::error!("Cannot start without the workbook: {}", e);
        e
    })?;

    let state = Arc::new(AppState::new(workbook, &config.advanced_sheet, config.distribution)?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let app = Router::new()
        .merge(routes::routes())
        .merge(routes::sheets::routes())
        .merge(routes::explore::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    workbook: Arc<Workbook>,
    explorer: Explorer,
}

impl AppState {
    fn new(
        workbook: Arc<Workbook>,
        advanced_sheet: &str,
        settings: DistributionSettings,
    ) -> Result<Self, AppError> {
        let explorer = Explorer::new(&workbook, advanced_sheet, settings)?;
        Ok(Self { workbook, explorer })
    }
}
