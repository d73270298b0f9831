//! Upload Service: authenticated upload probe for client-side throughput tests.

use axum::Router;
use shared::auth::KeyValidator;
use shared::config::ValidationError;
use shared::db::CoverageStore;
use shared::http::{ServiceInfo, common_routes, serve};
use std::sync::Arc;

pub mod api;
pub mod config;
mod metrics_defs;

pub use metrics_defs::ALL_METRICS;

pub const SERVICE_INFO: ServiceInfo = ServiceInfo {
    name: "upload-service",
    title: "Coverage Upload Service",
    version: env!("CARGO_PKG_VERSION"),
};

#[derive(thiserror::Error, Debug)]
pub enum UploadServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn router(config: &config::Config, store: Arc<dyn CoverageStore>) -> Router {
    api::routes(KeyValidator::new(store.clone()), config.max_upload_bytes)
        .merge(common_routes(SERVICE_INFO, store))
}

pub async fn run(
    config: &config::Config,
    store: Arc<dyn CoverageStore>,
) -> Result<(), UploadServiceError> {
    config.validate()?;
    tracing::info!(max_upload_bytes = config.max_upload_bytes, "Starting upload service");
    serve(&config.listener, router(config, store)).await?;
    Ok(())
}
