//! Data Service: authenticated ingestion of coverage measurements.

use axum::Router;
use shared::auth::KeyValidator;
use shared::config::ValidationError;
use shared::db::CoverageStore;
use shared::http::{ServiceInfo, common_routes, serve};
use std::sync::Arc;

pub mod api;
pub mod config;
mod metrics_defs;
pub mod store;

pub use metrics_defs::ALL_METRICS;

pub const SERVICE_INFO: ServiceInfo = ServiceInfo {
    name: "data-service",
    title: "Coverage Data Service",
    version: env!("CARGO_PKG_VERSION"),
};

#[derive(thiserror::Error, Debug)]
pub enum DataServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn router(store: Arc<dyn CoverageStore>) -> Router {
    api::routes(
        KeyValidator::new(store.clone()),
        store::MeasurementStore::new(store.clone()),
    )
    .merge(common_routes(SERVICE_INFO, store))
}

pub async fn run(
    config: &config::Config,
    store: Arc<dyn CoverageStore>,
) -> Result<(), DataServiceError> {
    config.validate()?;
    tracing::info!("Starting data service");
    serve(&config.listener, router(store)).await?;
    Ok(())
}
