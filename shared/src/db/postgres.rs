//! PostgreSQL-backed store.

use crate::db::error::{StoreError, StoreResult};
use crate::db::models::{ApiKeyRow, InsertOutcome, MeasurementRow, NewApiKey, NewMeasurement};
use crate::db::repos::{ApiKeyRepo, MeasurementRepo};
use crate::db::{CoverageStore, retry_on_conflict, schema_statements};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;

pub(crate) const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Connect using a `postgresql://` URL and apply the schema.
    pub async fn from_url(url: &str, max_connections: u32) -> StoreResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for statement in schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::from_write)?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CoverageStore for PostgresStore {
    /// Services starting together race on `CREATE TABLE IF NOT EXISTS`; the loser
    /// sees a catalog unique violation and applies the schema again.
    async fn migrate(&self) -> StoreResult<()> {
        retry_on_conflict(move || self.apply_schema()).await
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
impl ApiKeyRepo for PostgresStore {
    async fn get_api_key_by_device(
        &self,
        device_identifier: &str,
    ) -> StoreResult<Option<ApiKeyRow>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            "SELECT * FROM api_keys WHERE phone_identifier = $1",
        )
        .bind(device_identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_api_key(&self, api_key: &str) -> StoreResult<Option<ApiKeyRow>> {
        let row = sqlx::query_as::<_, ApiKeyRow>("SELECT * FROM api_keys WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_api_key(&self, key: &NewApiKey) -> StoreResult<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO api_keys (phone_identifier, api_key, created_at)
            VALUES ($1, $2, $3)
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
impl MeasurementRepo for PostgresStore {
    async fn insert_measurement(&self, m: &NewMeasurement) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO coverage_measurements (
                api_key, phone_identifier, timestamp,
                latitude, longitude, gps_accuracy,
                signal_strength_dbm, signal_strength_asu,
                network_type, data_network_type, mcc, mnc, cell_id,
                app_name, app_version, library_version,
                download_speed_kbps, upload_speed_kbps
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9,
                $10, $11, $12, $13, $14, $15, $16, $17, $18
            )
            RETURNING id
            "#,
        )
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

        tx.commit().await?;
        Ok(id)
    }

    async fn get_measurement(&self, id: i64) -> StoreResult<Option<MeasurementRow>> {
        let row = sqlx::query_as::<_, MeasurementRow>(
            "SELECT * FROM coverage_measurements WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
