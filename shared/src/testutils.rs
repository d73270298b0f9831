use crate::db::models::NewApiKey;
use crate::db::{CoverageStore, SqliteStore};
use std::sync::Arc;
use time::OffsetDateTime;

/// A fresh SQLite store in a temporary directory. Keep the directory alive for the test.
pub async fn sqlite_store() -> (tempfile::TempDir, Arc<SqliteStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("coverage.db"))
        .await
        .unwrap();
    (dir, Arc::new(store))
}

/// Register a key for `device_identifier` directly in the store and return it.
pub async fn register_key(store: &dyn CoverageStore, device_identifier: &str) -> String {
    let api_key = format!("test-key-{device_identifier}");
    store
        .insert_api_key(&NewApiKey {
            device_identifier: device_identifier.to_string(),
            api_key: api_key.clone(),
            created_at: OffsetDateTime::now_utc(),
        })
        .await
        .unwrap();
    api_key
}

/// Number of rows in `table`. Only for fixed table names.
pub async fn count_rows(store: &SqliteStore, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    sqlx::query_scalar(&sql)
        .fetch_one(store.pool())
        .await
        .unwrap()
}
