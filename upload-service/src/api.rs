//! Upload probe: authenticates, drains the uploaded file and reports its size.
//!
//! Nothing is stored. Clients time the request to estimate their upload throughput.

use crate::metrics_defs::{UPLOAD_BYTES, UPLOADS_COMPLETED};
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use shared::auth::{KeyValidator, redact};
use shared::error::ServiceError;
use shared::{counter, histogram};

/// Write size suggested to clients. The server drains whatever chunks the transport delivers.
pub const SUGGESTED_CHUNK_BYTES: usize = 8 * 1024;

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub file_size_bytes: u64,
}

#[derive(Serialize, Debug)]
pub struct UploadInfo {
    pub service: &'static str,
    pub max_file_size_bytes: usize,
    pub chunk_size_bytes: usize,
    pub supported_formats: &'static str,
    pub purpose: &'static str,
}

#[derive(Clone)]
struct ProbeState {
    validator: KeyValidator,
    max_upload_bytes: usize,
}

pub fn routes(validator: KeyValidator, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/test-data-upload",
            post(test_data_upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/upload-info", get(upload_info))
        .with_state(ProbeState {
            validator,
            max_upload_bytes,
        })
}

fn multipart_error(err: MultipartError) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge
    } else {
        ServiceError::MalformedRequest(err.body_text())
    }
}

/// The key may arrive before or after the file. When it comes first it is checked
/// before any file bytes are read; otherwise the file is counted first.
async fn test_data_upload(
    State(state): State<ProbeState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ServiceError> {
    let mut multipart = multipart.map_err(|e| ServiceError::MalformedRequest(e.body_text()))?;

    let mut api_key: Option<String> = None;
    let mut device_identifier: Option<String> = None;
    let mut file_size_bytes: Option<u64> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("api_key" | "apiKey") => {
                api_key = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") if file_size_bytes.is_none() => {
                if let Some(key) = &api_key {
                    device_identifier = Some(state.validator.resolve(key).await?);
                }

                let mut total: u64 = 0;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    total += chunk.len() as u64;
                }
                file_size_bytes = Some(total);
            }
            _ => {}
        }
    }

    let api_key = api_key.unwrap_or_default();
    if api_key.is_empty() {
        return Err(ServiceError::MissingCredential);
    }
    let file_size_bytes = file_size_bytes.ok_or(ServiceError::MissingPayload)?;

    let device_identifier = match device_identifier {
        Some(device) => device,
        None => state.validator.resolve(&api_key).await?,
    };

    counter!(UPLOADS_COMPLETED).increment(1);
    histogram!(UPLOAD_BYTES).record(file_size_bytes as f64);
    tracing::info!(
        device_prefix = %redact(&device_identifier),
        bytes = file_size_bytes,
        "Upload test completed"
    );

    Ok(Json(UploadResponse {
        status: "success",
        message: "Upload test completed successfully",
        file_size_bytes,
    }))
}

async fn upload_info(State(state): State<ProbeState>) -> Json<UploadInfo> {
    Json(UploadInfo {
        service: "upload-service",
        max_file_size_bytes: state.max_upload_bytes,
        chunk_size_bytes: SUGGESTED_CHUNK_BYTES,
        supported_formats: "any",
        purpose: "Accept uploads for client-side speed calculation",
    })
}
