use crate::registry::{KeyRegistry, RegistryError};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared::auth::redact;
use shared::error::ServiceError;

#[derive(Deserialize, Debug)]
pub struct GenerateKeyRequest {
    #[serde(
        default,
        alias = "phoneIdentifier",
        alias = "deviceIdentifier",
        alias = "device_identifier"
    )]
    pub phone_identifier: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct GenerateKeyResponse {
    pub api_key: String,
    pub status: &'static str,
}

pub fn routes(registry: KeyRegistry) -> Router {
    Router::new()
        .route("/api/generate-key", post(generate_key))
        .with_state(registry)
}

async fn generate_key(
    State(registry): State<KeyRegistry>,
    payload: Result<Json<GenerateKeyRequest>, JsonRejection>,
) -> Result<Json<GenerateKeyResponse>, ServiceError> {
    let Json(request) = payload?;
    let device_identifier = request.phone_identifier.unwrap_or_default();

    match registry.issue_or_fetch(&device_identifier).await {
        Ok(issued) => Ok(Json(GenerateKeyResponse {
            api_key: issued.api_key,
            status: "success",
        })),
        Err(RegistryError::EmptyIdentifier) => {
            Err(ServiceError::Validation(RegistryError::EmptyIdentifier.to_string()))
        }
        Err(e) => {
            tracing::error!(
                device_prefix = %redact(&device_identifier),
                error = %e,
                "Error generating API key"
            );
            Err(ServiceError::Persistence("Failed to generate API key"))
        }
    }
}
