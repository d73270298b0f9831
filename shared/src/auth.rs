//! API key validation.
//!
//! Keys are opaque bearer tokens stored in plaintext and matched by equality.
//! Anyone who can read the `api_keys` table can impersonate every device.

use crate::counter;
use crate::db::{CoverageStore, StoreError};
use crate::metrics_defs::AUTH_REJECTED;
use std::sync::Arc;

const REDACTED_PREFIX_LEN: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("API key is required")]
    MissingCredential,

    #[error("Invalid API key")]
    InvalidCredential,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Resolves presented API keys to the device they were issued to.
#[derive(Clone)]
pub struct KeyValidator {
    store: Arc<dyn CoverageStore>,
}

impl KeyValidator {
    pub fn new(store: Arc<dyn CoverageStore>) -> Self {
        KeyValidator { store }
    }

    /// Returns the device identifier that owns `api_key`.
    pub async fn resolve(&self, api_key: &str) -> Result<String, AuthError> {
        if api_key.is_empty() {
            counter!(AUTH_REJECTED, "reason" => "missing").increment(1);
            return Err(AuthError::MissingCredential);
        }

        match self.store.get_api_key(api_key).await? {
            Some(record) => Ok(record.device_identifier),
            None => {
                counter!(AUTH_REJECTED, "reason" => "invalid").increment(1);
                tracing::info!(key_prefix = %redact(api_key), "Rejected unknown API key");
                Err(AuthError::InvalidCredential)
            }
        }
    }
}

/// Truncate a credential or identifier for logging.
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(REDACTED_PREFIX_LEN).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{register_key, sqlite_store};

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("3f2b9c1e-8d4a-4f6e-9b7a-1c2d3e4f5a6b"),
            "3f2b9c1e..."
        );
        assert_eq!(redact("short"), "short...");
        assert_eq!(redact(""), "...");
        // Multi-byte characters are not split.
        assert_eq!(redact("ééééééééé"), "éééééééé...");
    }

    #[tokio::test]
    async fn test_resolve() {
        let (_dir, store) = sqlite_store().await;
        let api_key = register_key(&*store, "device-123").await;
        let validator = KeyValidator::new(store);

        assert_eq!(validator.resolve(&api_key).await.unwrap(), "device-123");

        assert!(matches!(
            validator.resolve("").await,
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            validator.resolve("bogus").await,
            Err(AuthError::InvalidCredential)
        ));
        // Exact match only.
        assert!(matches!(
            validator.resolve(&api_key.to_uppercase()).await,
            Err(AuthError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn test_resolve_surfaces_store_errors() {
        let (_dir, store) = sqlite_store().await;
        let validator = KeyValidator::new(store.clone());
        store.close().await;

        assert!(matches!(
            validator.resolve("any-key").await,
            Err(AuthError::Store(_))
        ));
    }
}
