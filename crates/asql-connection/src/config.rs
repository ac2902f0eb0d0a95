//! Client configuration: connection settings plus pool options

use asql_core::{AsqlError, Backend, ConnectionSettings, Result};
use serde::{Deserialize, Serialize};

use crate::pool::PoolConfig;

/// Configuration of one pooled client
///
/// Both halves are read from the same flat object, e.g.
///
/// ```json
/// { "host": "db", "port": 5432, "maxPoolSize": 20, "connectionRetryDelay": 1000 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Where and how to connect
    #[serde(flatten)]
    pub settings: ConnectionSettings,

    /// Pool sizing, retries, and idle handling
    #[serde(flatten)]
    pub pool: PoolConfig,
}

impl ClientConfig {
    /// Create a configuration from its two halves
    pub fn new(settings: ConnectionSettings, pool: PoolConfig) -> Self {
        Self { settings, pool }
    }

    /// Read a configuration from a JSON object
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the pool options
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        self.pool.validate().map_err(AsqlError::Configuration)
    }

    /// `host:port` this configuration points at for the given backend
    pub fn address(&self, backend: Backend) -> String {
        self.settings.address(backend)
    }
}
