//! asql core - Driver capability contract and shared types
//!
//! This crate provides the traits and types the pooling layer is written
//! against. It defines:
//!
//! - `Connection` - Trait for a physical connection supplied by a driver
//! - `ConnectionFactory` - Trait for creating new connections
//! - `DatabaseDriver` - Trait turning settings into a factory
//! - `Backend` - MySQL / PostgreSQL descriptors and defaults
//! - `ConnectionSettings`, `Value`, `QueryResult` and the error type

mod connection;
mod driver;
mod error;
mod settings;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use settings::*;
pub use types::*;
