use crate::store::{MeasurementStore, Submission};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared::auth::{KeyValidator, redact};
use shared::db::models::{DeviceInfo, Location, MeasurementData, Network, Signal, Throughput};
use shared::error::ServiceError;
use time::OffsetDateTime;

/// Body of `POST /api/send-data`. Every field except the key may be omitted.
#[derive(Deserialize, Debug, Default)]
pub struct SendDataRequest {
    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, alias = "gpsAccuracy")]
    pub gps_accuracy: Option<f64>,

    #[serde(default, alias = "signalStrengthDbm")]
    pub signal_strength_dbm: Option<i32>,
    #[serde(default, alias = "signalStrengthAsu")]
    pub signal_strength_asu: Option<i32>,

    #[serde(default, alias = "networkType")]
    pub network_type: Option<String>,
    #[serde(default, alias = "dataNetworkType")]
    pub data_network_type: Option<String>,
    #[serde(default, alias = "mobileCountryCode")]
    pub mcc: Option<i32>,
    #[serde(default, alias = "networkCode")]
    pub mnc: Option<i32>,
    #[serde(default, alias = "cellId")]
    pub cell_id: Option<i64>,

    #[serde(default, alias = "appName")]
    pub app_name: Option<String>,
    #[serde(default, alias = "appVersion")]
    pub app_version: Option<String>,
    #[serde(default, alias = "libraryVersion")]
    pub library_version: Option<String>,

    #[serde(default, alias = "downloadSpeedKbps")]
    pub download_speed_kbps: Option<f64>,
    #[serde(default, alias = "uploadSpeedKbps")]
    pub upload_speed_kbps: Option<f64>,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}

impl SendDataRequest {
    fn into_data(self) -> MeasurementData {
        MeasurementData {
            location: Location {
                latitude: self.latitude,
                longitude: self.longitude,
                accuracy: self.gps_accuracy,
            },
            signal: Signal {
                strength_dbm: self.signal_strength_dbm,
                strength_asu: self.signal_strength_asu,
            },
            network: Network {
                network_type: self.network_type,
                data_network_type: self.data_network_type,
                mobile_country_code: self.mcc,
                network_code: self.mnc,
                cell_id: self.cell_id,
            },
            device: DeviceInfo {
                app_name: self.app_name,
                app_version: self.app_version,
                library_version: self.library_version,
            },
            throughput: Throughput {
                download_kbps: self.download_speed_kbps,
                upload_kbps: self.upload_speed_kbps,
            },
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SendDataResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Clone)]
struct IngestState {
    validator: KeyValidator,
    measurements: MeasurementStore,
}

pub fn routes(validator: KeyValidator, measurements: MeasurementStore) -> Router {
    Router::new()
        .route("/api/send-data", post(send_data))
        .with_state(IngestState {
            validator,
            measurements,
        })
}

async fn send_data(
    State(state): State<IngestState>,
    payload: Result<Json<SendDataRequest>, JsonRejection>,
) -> Result<Json<SendDataResponse>, ServiceError> {
    let Json(mut request) = payload?;
    let api_key = request.api_key.take().unwrap_or_default();

    let device_identifier = state.validator.resolve(&api_key).await?;

    let submission = Submission {
        api_key,
        device_identifier,
        timestamp: request.timestamp,
        data: request.into_data(),
    };
    let device_prefix = redact(&submission.device_identifier);

    match state.measurements.record(submission).await {
        Ok(measurement_id) => {
            tracing::info!(%device_prefix, measurement_id, "Stored coverage data");
            Ok(Json(SendDataResponse {
                status: "success",
                message: "Coverage data stored successfully",
            }))
        }
        Err(e) => {
            tracing::error!(%device_prefix, error = %e, "Error storing coverage data");
            Err(ServiceError::Persistence("Failed to store coverage data"))
        }
    }
}
