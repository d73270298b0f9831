//! Repository traits implemented by every storage backend.

use crate::db::error::StoreResult;
use crate::db::models::{ApiKeyRow, InsertOutcome, MeasurementRow, NewApiKey, NewMeasurement};
use async_trait::async_trait;

/// Registry of device API keys.
#[async_trait]
pub trait ApiKeyRepo: Send + Sync {
    /// Get the key registered for a device.
    async fn get_api_key_by_device(
        &self,
        device_identifier: &str,
    ) -> StoreResult<Option<ApiKeyRow>>;

    /// Get a key record by its exact key value.
    async fn get_api_key(&self, api_key: &str) -> StoreResult<Option<ApiKeyRow>>;

    /// Insert a key unless the device already has one.
    ///
    /// A collision on the key value itself is reported as `StoreError::Conflict`.
    async fn insert_api_key(&self, key: &NewApiKey) -> StoreResult<InsertOutcome>;
}

/// Append-only log of coverage measurements.
#[async_trait]
pub trait MeasurementRepo: Send + Sync {
    /// Persist a measurement in a single transaction and return its id.
    async fn insert_measurement(&self, measurement: &NewMeasurement) -> StoreResult<i64>;

    /// Get a measurement by id.
    async fn get_measurement(&self, id: i64) -> StoreResult<Option<MeasurementRow>>;
}
