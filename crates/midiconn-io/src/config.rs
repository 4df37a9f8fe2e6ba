//! Serializable handle configuration.

use crate::error::{Error, Result};
use midiconn_backend::{Api, IgnoreFlags};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INPUT_CLIENT_NAME: &str = "midiconn Input Client";
pub const DEFAULT_OUTPUT_CLIENT_NAME: &str = "midiconn Output Client";
pub const DEFAULT_QUEUE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiInConfig {
    pub api: Api,
    pub client_name: String,
    /// Messages buffered for polling before new arrivals are dropped.
    pub queue_size: usize,
    pub ignore: IgnoreFlags,
}

impl Default for MidiInConfig {
    fn default() -> Self {
        Self {
            api: Api::Unspecified,
            client_name: DEFAULT_INPUT_CLIENT_NAME.to_string(),
            queue_size: DEFAULT_QUEUE_SIZE,
            ignore: IgnoreFlags::ALL,
        }
    }
}

impl MidiInConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(Error::InvalidConfig(
                "queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiOutConfig {
    pub api: Api,
    pub client_name: String,
}

impl Default for MidiOutConfig {
    fn default() -> Self {
        Self {
            api: Api::Unspecified,
            client_name: DEFAULT_OUTPUT_CLIENT_NAME.to_string(),
        }
    }
}
