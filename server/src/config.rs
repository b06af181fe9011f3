//! Server configuration.
//!
//! The data half of the configuration deserializes from TOML; the
//! injectable halves (listener, frame reader, MTI extractor, handlers,
//! id generator) are wired programmatically on [`crate::Server`] after
//! the data is loaded.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ServerError, ServerResult};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_READ_TIMEOUT_MS: u64 = 3 * 60 * 1000;
const DEFAULT_SIZE_CHUNK_LEN: usize = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the default listener binds when none is injected.
    pub bind_addr: String,
    /// How long a connection may stay silent between frames before it is
    /// deactivated.
    pub read_timeout_ms: u64,
    /// How many deactivated connections the registry keeps around before
    /// the stalest one is evicted.
    pub deactivated_capacity: usize,
    /// Width of the frame size prefix read off the wire.
    pub size_chunk_len: usize,
    pub log: LogCategories,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            deactivated_capacity: 0,
            size_chunk_len: DEFAULT_SIZE_CHUNK_LEN,
            log: LogCategories::default(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ServerResult<Self> {
        let path_text = path.as_ref().display().to_string();
        let contents = std::fs::read_to_string(&path).map_err(|e| ServerError::Config {
            path: path_text.clone(),
            reason: e.to_string(),
        })?;

        toml::from_str(&contents).map_err(|e| ServerError::Config {
            path: path_text,
            reason: e.to_string(),
        })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Per-category switches for the server's log events. Everything is on
/// by default; embedders running their own telemetry turn categories off
/// rather than filtering downstream.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LogCategories {
    pub accept_errors: bool,
    pub mti_read_errors: bool,
    pub undefined_handler: bool,
    pub connection_read_errors: bool,
    pub serving_connection: bool,
}

impl Default for LogCategories {
    fn default() -> Self {
        Self {
            accept_errors: true,
            mti_read_errors: true,
            undefined_handler: true,
            connection_read_errors: true,
            serving_connection: true,
        }
    }
}

impl LogCategories {
    /// Every category off.
    pub fn silent() -> Self {
        Self {
            accept_errors: false,
            mti_read_errors: false,
            undefined_handler: false,
            connection_read_errors: false,
            serving_connection: false,
        }
    }
}
