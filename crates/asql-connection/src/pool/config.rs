//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default upper bound on open connections
pub const DEFAULT_MAX_POOL_SIZE: usize = 10;
/// No connection retries by default
pub const DEFAULT_MAX_CONNECTION_RETRIES: i32 = 0;
/// 5 seconds between connection retries by default
pub const DEFAULT_CONNECTION_RETRY_DELAY_MS: u64 = 5_000;

/// Configuration for a connection pool
///
/// Controls pool sizing, connection retries, idle-connection testing and
/// idle-connection release. Serialized with the camelCase keys of the
/// client configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    /// Maximum number of connections open or being opened at once
    max_pool_size: usize,
    /// Retries after a failed connection attempt (negative = unlimited)
    max_connection_retries: i32,
    /// Delay in milliseconds between connection attempts
    #[serde(rename = "connectionRetryDelay")]
    connection_retry_delay_ms: u64,
    /// Timeout in milliseconds for the liveness probe of an idle connection
    #[serde(rename = "connectionTestTimeout")]
    connection_test_timeout_ms: Option<u64>,
    /// Time in milliseconds an idle connection may sit in the pool before it is closed
    #[serde(rename = "connectionReleaseDelay")]
    connection_release_delay_ms: Option<u64>,
}

impl PoolConfig {
    /// Create a new pool configuration with the given maximum size
    ///
    /// # Panics
    ///
    /// Panics if `max_pool_size` is 0.
    pub fn new(max_pool_size: usize) -> Self {
        assert!(
            max_pool_size > 0,
            "max_pool_size must be greater than 0, got {}",
            max_pool_size
        );

        Self {
            max_pool_size,
            max_connection_retries: DEFAULT_MAX_CONNECTION_RETRIES,
            connection_retry_delay_ms: DEFAULT_CONNECTION_RETRY_DELAY_MS,
            connection_test_timeout_ms: None,
            connection_release_delay_ms: None,
        }
    }

    /// Set the number of retries after a failed connection attempt
    ///
    /// 0 disables retries, a negative value retries forever.
    pub fn with_max_connection_retries(mut self, retries: i32) -> Self {
        self.max_connection_retries = retries;
        self
    }

    /// Set the delay between connection attempts in milliseconds
    pub fn with_connection_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.connection_retry_delay_ms = delay_ms;
        self
    }

    /// Enable the liveness probe for idle connections
    pub fn with_connection_test_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connection_test_timeout_ms = Some(timeout_ms);
        self
    }

    /// Close idle connections after they sat unused for this long
    pub fn with_connection_release_delay_ms(mut self, delay_ms: u64) -> Self {
        self.connection_release_delay_ms = Some(delay_ms);
        self
    }

    /// Get the maximum pool size
    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size
    }

    /// Get the retry bound (negative = unlimited)
    pub fn max_connection_retries(&self) -> i32 {
        self.max_connection_retries
    }

    /// Get the delay between connection attempts
    pub fn connection_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connection_retry_delay_ms)
    }

    /// Get the liveness probe timeout, if probing is enabled
    ///
    /// A zero timeout counts as disabled.
    pub fn connection_test_timeout(&self) -> Option<Duration> {
        self.connection_test_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Get the idle release delay, if enabled
    pub fn connection_release_delay(&self) -> Option<Duration> {
        self.connection_release_delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Check values that serde cannot reject on its own
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pool_size == 0 {
            return Err("maxPoolSize must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - max_pool_size: 10
    /// - max_connection_retries: 0
    /// - connection_retry_delay: 5 seconds
    /// - connection_test_timeout: disabled
    /// - connection_release_delay: disabled
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOL_SIZE)
    }
}
