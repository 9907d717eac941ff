//! # rambler
//!
//! Ordered SQL schema migrations tracked in a per-database ledger table.
//!
//! This library provides:
//!
//! - **Driver catalog** mapping driver names (`mysql`, `postgres`, `mssql`)
//!   to connection factories
//! - **Ledger connections** that create, read and update the tracking table
//! - **Migration engine** applying pending migrations in order and reversing
//!   the most recent ones, stopping at the first failure
//! - **Configuration** from YAML files with named environments and
//!   `RAMBLER_*` variable overrides
//!
//! ## Example
//!
//! ```rust,no_run
//! use rambler::{Config, DriverCatalog, Engine, Limit};
//!
//! #[tokio::main]
//! async fn main() -> rambler::Result<()> {
//!     let config = Config::load("rambler.yaml")?;
//!     let env = config.environment("default")?;
//!     let conn = DriverCatalog::with_builtins().connect_env(&env)?;
//!     let migrations = rambler::source::load_dir(&env.directory)?;
//!     let engine = Engine::new(conn, migrations)?;
//!     let report = engine.apply(Limit::All).await?;
//!     println!("Applied {} migrations", report.applied().len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod source;

// Re-exports for convenient access
pub use crate::core::{
    Conn, DriverCatalog, DriverFactory, LedgerDialect, Migration, MigrationState,
};
pub use config::{Config, Environment, RawEnvironment};
pub use drivers::{SslMode, TlsBuilder};
pub use engine::{
    Engine, Limit, MigrationOutcome, Operation, Outcome, Phase, RunFailure, RunReport,
    StatusEntry, StatusReport,
};
pub use error::{MigrateError, Result};
