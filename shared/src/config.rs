use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Database max_connections cannot be 0")]
    InvalidMaxConnections,

    #[error("Database url cannot be empty")]
    EmptyDatabaseUrl,

    #[error("max_upload_bytes cannot be 0")]
    InvalidMaxUploadBytes,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn new<H: Into<String>>(host: H, port: u16) -> Self {
        Listener {
            host: host.into(),
            port,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where measurements and API keys are persisted.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum DatabaseConfig {
    Sqlite {
        path: PathBuf,
    },
    Postgres {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::Sqlite {
            path: PathBuf::from("coverage.db"),
        }
    }
}

impl DatabaseConfig {
    /// Connection settings used when only a postgres URL is known, e.g. from `DATABASE_URL`.
    pub fn postgres<U: Into<String>>(url: U) -> Self {
        DatabaseConfig::Postgres {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DatabaseConfig::Sqlite { .. } => Ok(()),
            DatabaseConfig::Postgres {
                url,
                max_connections,
            } => {
                if url.is_empty() {
                    return Err(ValidationError::EmptyDatabaseUrl);
                }
                if *max_connections == 0 {
                    return Err(ValidationError::InvalidMaxConnections);
                }
                Ok(())
            }
        }
    }
}
