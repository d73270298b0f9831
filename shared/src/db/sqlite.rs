//! SQLite-backed store, used for single-node deployments and tests.

use crate::db::error::{StoreError, StoreResult};
use crate::db::models::{ApiKeyRow, InsertOutcome, MeasurementRow, NewApiKey, NewMeasurement};
use crate::db::repos::{ApiKeyRepo, MeasurementRepo};
use crate::db::{CoverageStore, schema_statements};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

pub(crate) const SQLITE_SCHEMA: &str = include_str!("sqlite_schema.sql");

const INSERT_MEASUREMENT: &str = r#"
    INSERT INTO coverage_measurements (
        api_key, phone_identifier, timestamp,
        latitude, longitude, gps_accuracy,
        signal_strength_dbm, signal_strength_asu,
        network_type, data_network_type, mcc, mnc, cell_id,
        app_name, app_version, library_version,
        download_speed_kbps, upload_speed_kbps
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    RETURNING id
"#;

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path` and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        // SQLite allows a single writer; one connection avoids "database is locked" under load.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Insert inside a transaction, running `before_commit` with the new id before committing.
    /// If the hook fails the transaction is dropped and rolled back.
    pub(crate) async fn insert_measurement_with<F>(
        &self,
        m: &NewMeasurement,
        before_commit: F,
    ) -> StoreResult<i64>
    where
        F: FnOnce(i64) -> StoreResult<()> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(INSERT_MEASUREMENT)
            .bind(&m.api_key)
            .bind(&m.device_identifier)
            .bind(m.timestamp)
            .bind(m.data.location.latitude)
            .bind(m.data.location.longitude)
            .bind(m.data.location.accuracy)
            .bind(m.data.signal.strength_dbm)
            .bind(m.data.signal.strength_asu)
            .bind(&m.data.network.network_type)
            .bind(&m.data.network.data_network_type)
            .bind(m.data.network.mobile_country_code)
            .bind(m.data.network.network_code)
            .bind(m.data.network.cell_id)
            .bind(&m.data.device.app_name)
            .bind(&m.data.device.app_version)
            .bind(&m.data.device.library_version)
            .bind(m.data.throughput.download_kbps)
            .bind(m.data.throughput.upload_kbps)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from_write)?;

        before_commit(id)?;

        tx.commit().await?;
        Ok(id)
    }
}

#[async_trait]
impl CoverageStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for statement in schema_statements(SQLITE_SCHEMA) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ApiKeyRepo for SqliteStore {
    async fn get_api_key_by_device(
        &self,
        device_identifier: &str,
    ) -> StoreResult<Option<ApiKeyRow>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT * FROM api_keys WHERE phone_identifier = ?",
        )
        .bind(device_identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_api_key(&self, api_key: &str) -> StoreResult<Option<ApiKeyRow>> {
        let row = sqlx::query_as::<_, ApiKeyRow>("SELECT * FROM api_keys WHERE api_key = ?")
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_api_key(&self, key: &NewApiKey) -> StoreResult<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO api_keys (phone_identifier, api_key, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (phone_identifier) DO NOTHING
            "#,
        )
        .bind(&key.device_identifier)
        .bind(&key.api_key)
        .bind(key.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_write)?;

        Ok(match result.rows_affected() {
            0 => InsertOutcome::DeviceConflict,
            _ => InsertOutcome::Inserted,
        })
    }
}

#[async_trait]
impl MeasurementRepo for SqliteStore {
    async fn insert_measurement(&self, measurement: &NewMeasurement) -> StoreResult<i64> {
        self.insert_measurement_with(measurement, |_| Ok(())).await
    }

    async fn get_measurement(&self, id: i64) -> StoreResult<Option<MeasurementRow>> {
        let row = sqlx::query_as::<_, MeasurementRow>(
            "SELECT * FROM coverage_measurements WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
