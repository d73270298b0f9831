//! Persists coverage measurements for already authenticated devices.

use crate::metrics_defs::{MEASUREMENTS_FAILED, MEASUREMENTS_STORED};
use shared::counter;
use shared::db::models::{MeasurementData, NewMeasurement};
use shared::db::{CoverageStore, StoreError};
use std::sync::Arc;
use time::OffsetDateTime;

/// A measurement as submitted by a device whose key has been resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Submission {
    pub api_key: String,
    pub device_identifier: String,
    /// Client-side sample time. Defaults to the time of recording.
    pub timestamp: Option<OffsetDateTime>,
    pub data: MeasurementData,
}

#[derive(Clone)]
pub struct MeasurementStore {
    store: Arc<dyn CoverageStore>,
}

impl MeasurementStore {
    pub fn new(store: Arc<dyn CoverageStore>) -> Self {
        MeasurementStore { store }
    }

    /// Write the measurement atomically and return its id.
    ///
    /// Field values are stored as given. The key is not re-validated here.
    pub async fn record(&self, submission: Submission) -> Result<i64, StoreError> {
        let measurement = NewMeasurement {
            api_key: submission.api_key,
            device_identifier: submission.device_identifier,
            timestamp: submission
                .timestamp
                .unwrap_or_else(OffsetDateTime::now_utc),
            data: submission.data,
        };

        match self.store.insert_measurement(&measurement).await {
            Ok(id) => {
                counter!(MEASUREMENTS_STORED).increment(1);
                Ok(id)
            }
            Err(e) => {
                counter!(MEASUREMENTS_FAILED).increment(1);
                Err(e)
            }
        }
    }
}
