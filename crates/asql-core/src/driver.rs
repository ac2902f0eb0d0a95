//! Backend descriptors and the driver trait

use crate::{ConnectionFactory, ConnectionSettings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The SQL server family a pool talks to.
///
/// Pools of different backends live in separate registry namespaces, so
/// `"main"` for MySQL and `"main"` for PostgreSQL never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgresql", alias = "postgres")]
    PostgreSql,
}

impl Backend {
    /// Driver name reported by connections of this backend
    pub fn driver_name(&self) -> &'static str {
        match self {
            Backend::MySql => "mysql",
            Backend::PostgreSql => "postgresql",
        }
    }

    /// Default server port
    pub fn default_port(&self) -> u16 {
        match self {
            Backend::MySql => 3306,
            Backend::PostgreSql => 5432,
        }
    }

    /// Pool name used by `create_shared_default`
    pub fn default_pool_name(&self) -> &'static str {
        match self {
            Backend::MySql => "DEFAULT_MYSQL_DS",
            Backend::PostgreSql => "DEFAULT_POSTGRESQL_DS",
        }
    }

    /// Registry namespace for shared pools of this backend
    pub fn namespace(&self) -> &'static str {
        match self {
            Backend::MySql => "asql.pools.MySQL",
            Backend::PostgreSql => "asql.pools.PostgreSQL",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::MySql => write!(f, "MySQL"),
            Backend::PostgreSql => write!(f, "PostgreSQL"),
        }
    }
}

/// A protocol driver for one backend.
///
/// The driver turns connection settings into a factory; the pool asks that
/// factory for every new physical connection.
pub trait DatabaseDriver: Send + Sync {
    /// Backend this driver speaks
    fn backend(&self) -> Backend;

    /// Build a connection factory for the given settings
    fn connection_factory(&self, settings: &ConnectionSettings) -> Arc<dyn ConnectionFactory>;
}
