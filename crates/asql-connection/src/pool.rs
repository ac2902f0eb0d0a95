//! Connection pooling for database connections
//!
//! This module provides a bounded pool with a FIFO wait queue, connection
//! retries, optional liveness probing of idle connections, and optional
//! release of connections that sit idle for too long.
//!
//! # Example
//!
//! ```ignore
//! use asql_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(5)
//!     .with_max_connection_retries(3)
//!     .with_connection_retry_delay_ms(1000)
//!     .with_connection_test_timeout_ms(500);
//!
//! let pool = ConnectionPool::new(config, connection_factory);
//! let conn = pool.take().await?;
//! // Use connection...
//! pool.give_back(conn);
//! ```

mod config;
mod pool;
mod probe;
mod retry;
mod stats;


pub use config::{
    DEFAULT_CONNECTION_RETRY_DELAY_MS, DEFAULT_MAX_CONNECTION_RETRIES, DEFAULT_MAX_POOL_SIZE,
    PoolConfig,
};
pub use pool::{ConnectionPool, PooledConnection};
pub use probe::{PROBE_QUERY, ProbeError, probe_connection};
pub use retry::RetryPolicy;
pub use stats::PoolStats;
