//! Pooled SQL client for one backend

use asql_core::{Backend, DatabaseDriver, QueryResult, Result, Value};

use crate::config::ClientConfig;
use crate::pool::{ConnectionPool, PoolStats, PooledConnection};

/// A client that runs statements on pooled connections
///
/// Owns exactly one [`ConnectionPool`]. The one-shot helpers take a
/// connection, send the statement, and give the connection back whether or
/// not the statement succeeded.
pub struct SqlClient {
    backend: Backend,
    address: String,
    pool: ConnectionPool,
}

impl SqlClient {
    /// Create a client whose connections come from `driver`
    pub fn new(backend: Backend, config: &ClientConfig, driver: &dyn DatabaseDriver) -> Self {
        let address = config.address(backend);
        tracing::info!(
            backend = %backend,
            address = %address,
            max_pool_size = config.pool.max_pool_size(),
            "creating pooled client"
        );
        let factory = driver.connection_factory(&config.settings);
        Self {
            backend,
            address,
            pool: ConnectionPool::with_factory(config.pool.clone(), factory),
        }
    }

    /// Create a client around an existing pool
    pub fn with_pool(backend: Backend, pool: ConnectionPool) -> Self {
        Self {
            backend,
            address: String::new(),
            pool,
        }
    }

    /// Backend this client talks to
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The underlying pool
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Current pool statistics
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Borrow a connection; it goes back to the pool when dropped
    pub async fn get_connection(&self) -> Result<PooledConnection> {
        self.pool.get().await
    }

    /// Run a query on a pooled connection
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        let conn = self.get_connection().await?;
        conn.send_query(sql).await
    }

    /// Run a parameterized query on a pooled connection
    pub async fn query_with_params(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let conn = self.get_connection().await?;
        conn.send_prepared_statement(sql, params).await
    }

    /// Run an update and return the number of affected rows
    pub async fn update(&self, sql: &str) -> Result<u64> {
        Ok(self.query(sql).await?.rows_affected)
    }

    /// Run a parameterized update and return the number of affected rows
    pub async fn update_with_params(&self, sql: &str, params: &[Value]) -> Result<u64> {
        Ok(self.query_with_params(sql, params).await?.rows_affected)
    }

    /// Close the underlying pool
    pub async fn close(&self) -> Result<()> {
        tracing::info!(backend = %self.backend, address = %self.address, "stopping pooled client");
        self.pool.close().await
    }
}
