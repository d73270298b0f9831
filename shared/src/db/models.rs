//! Row types for the `api_keys` and `coverage_measurements` tables.

use sqlx::FromRow;
use time::OffsetDateTime;

/// A device's registered API key.
#[derive(Clone, Debug, PartialEq, FromRow)]
pub struct ApiKeyRow {
    pub id: i64,
    #[sqlx(rename = "phone_identifier")]
    pub device_identifier: String,
    pub api_key: String,
    pub created_at: OffsetDateTime,
}

/// An API key that has not been persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewApiKey {
    pub device_identifier: String,
    pub api_key: String,
    pub created_at: OffsetDateTime,
}

/// Result of an insert guarded by the unique device identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another row already holds this device identifier; nothing was written.
    DeviceConflict,
}

#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sqlx(rename = "gps_accuracy")]
    pub accuracy: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct Signal {
    #[sqlx(rename = "signal_strength_dbm")]
    pub strength_dbm: Option<i32>,
    #[sqlx(rename = "signal_strength_asu")]
    pub strength_asu: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct Network {
    pub network_type: Option<String>,
    pub data_network_type: Option<String>,
    #[sqlx(rename = "mcc")]
    pub mobile_country_code: Option<i32>,
    #[sqlx(rename = "mnc")]
    pub network_code: Option<i32>,
    pub cell_id: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct DeviceInfo {
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub library_version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct Throughput {
    #[sqlx(rename = "download_speed_kbps")]
    pub download_kbps: Option<f64>,
    #[sqlx(rename = "upload_speed_kbps")]
    pub upload_kbps: Option<f64>,
}

/// Optional telemetry carried by a measurement. Any subset may be present.
#[derive(Clone, Debug, Default, PartialEq, FromRow)]
pub struct MeasurementData {
    #[sqlx(flatten)]
    pub location: Location,
    #[sqlx(flatten)]
    pub signal: Signal,
    #[sqlx(flatten)]
    pub network: Network,
    #[sqlx(flatten)]
    pub device: DeviceInfo,
    #[sqlx(flatten)]
    pub throughput: Throughput,
}

/// A measurement ready to be written, already tagged with the resolved device.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMeasurement {
    pub api_key: String,
    pub device_identifier: String,
    pub timestamp: OffsetDateTime,
    pub data: MeasurementData,
}

/// A persisted coverage measurement.
#[derive(Clone, Debug, PartialEq, FromRow)]
pub struct MeasurementRow {
    pub id: i64,
    pub api_key: String,
    #[sqlx(rename = "phone_identifier")]
    pub device_identifier: String,
    pub timestamp: OffsetDateTime,
    #[sqlx(flatten)]
    pub data: MeasurementData,
}
