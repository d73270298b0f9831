use serde::Deserialize;
use shared::config::{Listener, ValidationError};

fn default_listener() -> Listener {
    Listener::new("0.0.0.0", 8002)
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_listener")]
    pub listener: Listener,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: default_listener(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()
    }
}
