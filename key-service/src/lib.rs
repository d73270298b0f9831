//! Key Service: issues one API key per device.

use axum::Router;
use shared::config::ValidationError;
use shared::db::CoverageStore;
use shared::http::{ServiceInfo, common_routes, serve};
use std::sync::Arc;

pub mod api;
pub mod config;
mod metrics_defs;
pub mod registry;

pub use metrics_defs::ALL_METRICS;

pub const SERVICE_INFO: ServiceInfo = ServiceInfo {
    name: "key-service",
    title: "Coverage Key Service",
    version: env!("CARGO_PKG_VERSION"),
};

#[derive(thiserror::Error, Debug)]
pub enum KeyServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn router(store: Arc<dyn CoverageStore>) -> Router {
    api::routes(registry::KeyRegistry::new(store.clone()))
        .merge(common_routes(SERVICE_INFO, store))
}

pub async fn run(
    config: &config::Config,
    store: Arc<dyn CoverageStore>,
) -> Result<(), KeyServiceError> {
    config.validate()?;
    tracing::info!("Starting key service");
    serve(&config.listener, router(store)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use shared::testutils::sqlite_store;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_serves_common_and_api_routes() {
        let (_dir, store) = sqlite_store().await;
        let app = router(store);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Coverage Key Service");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/generate-key")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"phone_identifier": "device-123"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
