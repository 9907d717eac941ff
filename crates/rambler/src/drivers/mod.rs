//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`mysql`]: MySQL / MariaDB driver
//! - [`postgres`]: PostgreSQL driver
//! - [`mssql`]: Microsoft SQL Server driver
//! - [`common`]: Shared utilities (TLS)
//!
//! # Architecture
//!
//! Each driver module provides:
//! - a `LedgerDialect` with the engine's SQL syntax for the ledger table
//! - a `Conn` implementation backed by a single-connection pool
//! - a `register` function called by `DriverCatalog::with_builtins()`
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/`
//! 2. Implement `LedgerDialect` and `Conn`
//! 3. Expose a `register` function and call it from `DriverCatalog::with_builtins()`
//! 4. Gate the driver with a feature flag in `Cargo.toml`

pub mod common;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{SslMode, TlsBuilder};

#[cfg(feature = "mssql")]
pub use mssql::{MssqlConn, MssqlDialect};
#[cfg(feature = "mysql")]
pub use mysql::{MysqlConn, MysqlDialect};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresConn, PostgresDialect};
