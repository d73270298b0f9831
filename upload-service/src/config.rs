use serde::Deserialize;
use shared::config::{Listener, ValidationError};

/// 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

fn default_listener() -> Listener {
    Listener::new("0.0.0.0", 8003)
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_listener")]
    pub listener: Listener,
    /// Upper bound on the request body, multipart framing included.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: default_listener(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if self.max_upload_bytes == 0 {
            return Err(ValidationError::InvalidMaxUploadBytes);
        }
        Ok(())
    }
}
