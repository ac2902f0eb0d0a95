//! Connection capability provided by a protocol driver

use crate::{QueryResult, Result, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// A physical database connection.
///
/// Wire protocol, row decoding and transport all live behind this trait.
/// The pool only needs to open, probe, and drop connections.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mysql", "postgresql")
    fn driver_name(&self) -> &str;

    /// Perform the handshake with the server
    async fn connect(&self) -> Result<()>;

    /// Check if the connection is still usable
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn disconnect(&self) -> Result<()>;

    /// Send a plain SQL statement
    async fn send_query(&self, sql: &str) -> Result<QueryResult>;

    /// Send a statement with bound parameters
    async fn send_prepared_statement(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;
}

/// Factory for new, not yet connected, connections.
///
/// `create` may fail before any I/O happens (bad settings, driver refusing
/// to build a connection). Callers treat that the same as a failed connect.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new connection object
    fn create(&self) -> Result<Arc<dyn Connection>>;
}

impl<T: ConnectionFactory + ?Sized> ConnectionFactory for Arc<T> {
    fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create()
    }
}
