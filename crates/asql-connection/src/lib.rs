//! asql connection - Pooled clients and the shared client registry
//!
//! This crate turns a driver's connections into pooled, shareable clients:
//!
//! - `ConnectionPool` - Bounded pool with FIFO waiters, retries and liveness probes
//! - `SqlClient` - One pool plus one-shot query and update helpers
//! - `ClientHolder` / `ClientWrapper` - Reference counting around a shared client
//! - `ClientRegistry` - Named shared clients, one namespace per backend

mod client;
mod config;
mod holder;
pub mod pool;
mod registry;
mod wrapper;

#[cfg(test)]
mod testing;

pub use client::SqlClient;
pub use config::ClientConfig;
pub use holder::ClientHolder;
pub use pool::{
    ConnectionPool, PoolConfig, PoolStats, PooledConnection, ProbeError, RetryPolicy,
    probe_connection,
};
pub use registry::ClientRegistry;
pub use wrapper::ClientWrapper;
