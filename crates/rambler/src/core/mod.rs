//! Core abstractions for database-agnostic migration tracking.
//!
//! - [`migration`]: migration records and their lifecycle states
//! - [`traits`]: the connection contract and the ledger dialect strategy
//! - [`catalog`]: driver registry for dependency injection
//!
//! # Architecture
//!
//! The core module defines database-agnostic abstractions that are implemented
//! by driver modules (`drivers/mysql`, `drivers/postgres`, `drivers/mssql`).
//! The engine only ever sees a `Box<dyn Conn>` produced by the catalog.

pub mod catalog;
pub mod migration;
pub mod traits;

#[cfg(test)]
pub(crate) mod memory;

pub use catalog::{DriverCatalog, DriverFactory};
pub use migration::{Migration, MigrationState};
pub use traits::{Conn, LedgerDialect};
