//! Per-caller handle onto a shared client

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use asql_core::{AsqlError, Backend, QueryResult, Result, Value};

use crate::client::SqlClient;
use crate::holder::ClientHolder;
use crate::pool::{PoolStats, PooledConnection};

/// One reference to a shared client
///
/// Every data operation goes straight to the shared client. Closing the
/// wrapper releases this reference exactly once; repeated calls are no-ops.
/// Dropping a wrapper without closing it keeps the reference alive.
pub struct ClientWrapper {
    holder: Arc<ClientHolder>,
    client: Arc<SqlClient>,
    closed: AtomicBool,
}

impl ClientWrapper {
    /// Wrap a holder that already counts this reference
    pub fn new(holder: Arc<ClientHolder>) -> Result<Self> {
        let client = holder.client()?;
        Ok(Self {
            holder,
            client,
            closed: AtomicBool::new(false),
        })
    }

    pub fn backend(&self) -> Backend {
        self.client.backend()
    }

    /// Identity of the shared client this wrapper references
    pub fn holder_id(&self) -> uuid::Uuid {
        self.holder.id()
    }

    /// The shared client
    pub fn client(&self) -> &SqlClient {
        &self.client
    }

    pub fn stats(&self) -> PoolStats {
        self.client.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(AsqlError::PoolClosed("client has been closed".into()));
        }
        Ok(())
    }

    pub async fn get_connection(&self) -> Result<PooledConnection> {
        self.ensure_open()?;
        self.client.get_connection().await
    }

    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.ensure_open()?;
        self.client.query(sql).await
    }

    pub async fn query_with_params(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.ensure_open()?;
        self.client.query_with_params(sql, params).await
    }

    pub async fn update(&self, sql: &str) -> Result<u64> {
        self.ensure_open()?;
        self.client.update(sql).await
    }

    pub async fn update_with_params(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.ensure_open()?;
        self.client.update_with_params(sql, params).await
    }

    /// Release this reference to the shared client
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.holder.close().await
    }
}

impl std::fmt::Debug for ClientWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientWrapper")
            .field("holder", &self.holder.id())
            .field("backend", &self.holder.backend())
            .field("closed", &self.is_closed())
            .finish()
    }
}
