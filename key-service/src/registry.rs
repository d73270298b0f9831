//! Issues one durable API key per device identifier.

use crate::metrics_defs::{KEY_ISSUANCE_CONFLICTS, KEYS_ISSUED};
use shared::auth::redact;
use shared::counter;
use shared::db::models::{InsertOutcome, NewApiKey};
use shared::db::{CoverageStore, StoreError};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

// Bounds retries when a freshly minted key collides with a stored one.
const MAX_MINT_ATTEMPTS: usize = 3;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("Phone identifier is required")]
    EmptyIdentifier,

    #[error("could not mint a unique API key after {0} attempts")]
    KeyCollision(usize),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IssuedKey {
    pub api_key: String,
    /// False when the device already had a key and it was returned unchanged.
    pub created: bool,
}

#[derive(Clone)]
pub struct KeyRegistry {
    store: Arc<dyn CoverageStore>,
}

impl KeyRegistry {
    pub fn new(store: Arc<dyn CoverageStore>) -> Self {
        KeyRegistry { store }
    }

    /// Return the device's key, minting and persisting one on first contact.
    ///
    /// Concurrent first-time calls for the same device all return the key of
    /// whichever insert won; the unique constraint on the device identifier
    /// decides the winner.
    pub async fn issue_or_fetch(
        &self,
        device_identifier: &str,
    ) -> Result<IssuedKey, RegistryError> {
        if device_identifier.is_empty() {
            return Err(RegistryError::EmptyIdentifier);
        }

        if let Some(existing) = self.store.get_api_key_by_device(device_identifier).await? {
            counter!(KEYS_ISSUED, "outcome" => "existing").increment(1);
            tracing::info!(
                device_prefix = %redact(device_identifier),
                "Returning existing API key"
            );
            return Ok(IssuedKey {
                api_key: existing.api_key,
                created: false,
            });
        }

        for _ in 0..MAX_MINT_ATTEMPTS {
            let candidate = NewApiKey {
                device_identifier: device_identifier.to_string(),
                api_key: Uuid::new_v4().to_string(),
                created_at: OffsetDateTime::now_utc(),
            };

            match self.store.insert_api_key(&candidate).await {
                Ok(InsertOutcome::Inserted) => {
                    counter!(KEYS_ISSUED, "outcome" => "created").increment(1);
                    tracing::info!(
                        device_prefix = %redact(device_identifier),
                        "Generated new API key"
                    );
                    return Ok(IssuedKey {
                        api_key: candidate.api_key,
                        created: true,
                    });
                }
                Ok(InsertOutcome::DeviceConflict) => {
                    counter!(KEY_ISSUANCE_CONFLICTS).increment(1);
                    return self.fetch_winner(device_identifier).await;
                }
                Err(StoreError::Conflict(reason)) => {
                    tracing::warn!(%reason, "Minted API key already exists, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RegistryError::KeyCollision(MAX_MINT_ATTEMPTS))
    }

    /// Re-read the key written by the request that won the registration race.
    async fn fetch_winner(&self, device_identifier: &str) -> Result<IssuedKey, RegistryError> {
        tracing::info!(
            device_prefix = %redact(device_identifier),
            "Concurrent registration detected, returning the stored key"
        );

        match self.store.get_api_key_by_device(device_identifier).await? {
            Some(winner) => {
                counter!(KEYS_ISSUED, "outcome" => "existing").increment(1);
                Ok(IssuedKey {
                    api_key: winner.api_key,
                    created: false,
                })
            }
            None => Err(StoreError::Conflict(
                "device identifier conflict reported but no key is stored".to_string(),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::db::models::{ApiKeyRow, MeasurementRow, NewMeasurement};
    use shared::db::{ApiKeyRepo, MeasurementRepo, SqliteStore, StoreResult};
    use shared::testutils::{count_rows, sqlite_store};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_issue_is_idempotent() {
        let (_dir, store) = sqlite_store().await;
        let registry = KeyRegistry::new(store.clone());

        let first = registry.issue_or_fetch("device-123").await.unwrap();
        let second = registry.issue_or_fetch("device-123").await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.api_key, second.api_key);
        assert_eq!(count_rows(&store, "api_keys").await, 1);
    }

    #[tokio::test]
    async fn test_key_format() {
        let (_dir, store) = sqlite_store().await;
        let registry = KeyRegistry::new(store);

        let issued = registry.issue_or_fetch("device-123").await.unwrap();
        let parsed = Uuid::parse_str(&issued.api_key).expect("key is a uuid");
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(issued.api_key, parsed.hyphenated().to_string());
    }

    #[tokio::test]
    async fn test_distinct_devices_get_distinct_keys() {
        let (_dir, store) = sqlite_store().await;
        let registry = KeyRegistry::new(store.clone());

        let mut keys = HashSet::new();
        for i in 0..200 {
            let issued = registry
                .issue_or_fetch(&format!("device-{i}"))
                .await
                .unwrap();
            assert!(keys.insert(issued.api_key));
        }
        assert_eq!(count_rows(&store, "api_keys").await, 200);
    }

    #[tokio::test]
    async fn test_empty_identifier_is_rejected() {
        let (_dir, store) = sqlite_store().await;
        let registry = KeyRegistry::new(store.clone());

        assert!(matches!(
            registry.issue_or_fetch("").await,
            Err(RegistryError::EmptyIdentifier)
        ));
        assert_eq!(count_rows(&store, "api_keys").await, 0);
    }

    #[tokio::test]
    async fn test_identifier_is_stored_verbatim() {
        let (_dir, store) = sqlite_store().await;
        let registry = KeyRegistry::new(store.clone());

        let blank = registry.issue_or_fetch("   ").await.unwrap();
        let padded = registry.issue_or_fetch(" device-123 ").await.unwrap();
        let plain = registry.issue_or_fetch("device-123").await.unwrap();

        assert!(blank.created && padded.created && plain.created);
        assert_ne!(padded.api_key, plain.api_key);
        assert_eq!(registry.issue_or_fetch("   ").await.unwrap().api_key, blank.api_key);
        assert_eq!(count_rows(&store, "api_keys").await, 3);
    }

    #[tokio::test]
    async fn test_concurrent_first_registration() {
        let (_dir, store) = sqlite_store().await;
        let registry = KeyRegistry::new(store.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.issue_or_fetch("device-race").await })
            })
            .collect();

        let mut keys = HashSet::new();
        for handle in handles {
            keys.insert(handle.await.unwrap().unwrap().api_key);
        }

        assert_eq!(keys.len(), 1);
        assert_eq!(count_rows(&store, "api_keys").await, 1);
    }

    /// Hides the existing row from the first lookup, as if another request
    /// inserted it between our lookup and our insert.
    struct RaceLosingStore {
        inner: Arc<SqliteStore>,
        hide_next_lookup: AtomicBool,
    }

    #[async_trait]
    impl ApiKeyRepo for RaceLosingStore {
        async fn get_api_key_by_device(
            &self,
            device_identifier: &str,
        ) -> StoreResult<Option<ApiKeyRow>> {
            if self.hide_next_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.get_api_key_by_device(device_identifier).await
        }

        async fn get_api_key(&self, api_key: &str) -> StoreResult<Option<ApiKeyRow>> {
            self.inner.get_api_key(api_key).await
        }

        async fn insert_api_key(&self, key: &NewApiKey) -> StoreResult<InsertOutcome> {
            self.inner.insert_api_key(key).await
        }
    }

    #[async_trait]
    impl MeasurementRepo for RaceLosingStore {
        async fn insert_measurement(&self, measurement: &NewMeasurement) -> StoreResult<i64> {
            self.inner.insert_measurement(measurement).await
        }

        async fn get_measurement(&self, id: i64) -> StoreResult<Option<MeasurementRow>> {
            self.inner.get_measurement(id).await
        }
    }

    #[async_trait]
    impl CoverageStore for RaceLosingStore {
        async fn migrate(&self) -> StoreResult<()> {
            self.inner.migrate().await
        }

        async fn health_check(&self) -> StoreResult<()> {
            self.inner.health_check().await
        }

        async fn close(&self) {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn test_race_loser_returns_winner_key() {
        let (_dir, store) = sqlite_store().await;
        let winner = KeyRegistry::new(store.clone())
            .issue_or_fetch("device-123")
            .await
            .unwrap();

        let racing = Arc::new(RaceLosingStore {
            inner: store.clone(),
            hide_next_lookup: AtomicBool::new(true),
        });
        let loser = KeyRegistry::new(racing.clone())
            .issue_or_fetch("device-123")
            .await
            .unwrap();

        assert!(!racing.hide_next_lookup.load(Ordering::SeqCst));
        assert!(!loser.created);
        assert_eq!(loser.api_key, winner.api_key);
        assert_eq!(count_rows(&store, "api_keys").await, 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let (_dir, store) = sqlite_store().await;
        let registry = KeyRegistry::new(store.clone());
        store.close().await;

        assert!(matches!(
            registry.issue_or_fetch("device-123").await,
            Err(RegistryError::Store(_))
        ));
    }
}
