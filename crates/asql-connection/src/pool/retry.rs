//! Retry policy for establishing connections
//!
//! Attempts are spaced by a fixed delay. The bound counts retries, not
//! attempts: a bound of `R` allows `R + 1` attempts in total.

use std::time::Duration;

use super::config::PoolConfig;

/// How often and how fast a failed connection attempt is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` means retry forever
    max_retries: Option<u32>,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries (negative = unlimited)
    pub fn new(max_retries: i32, delay: Duration) -> Self {
        Self {
            max_retries: u32::try_from(max_retries).ok(),
            delay,
        }
    }

    /// Build the policy described by a pool configuration
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(
            config.max_connection_retries(),
            config.connection_retry_delay(),
        )
    }

    /// Whether another attempt may follow after `retries_done` retries
    pub fn allows_retry(&self, retries_done: u32) -> bool {
        match self.max_retries {
            None => true,
            Some(max) => retries_done < max,
        }
    }

    /// Delay before the next attempt
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Retry bound, `None` when unlimited
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PoolConfig::default())
    }
}
