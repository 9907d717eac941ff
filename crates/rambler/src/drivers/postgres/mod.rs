//! PostgreSQL database driver.
//!
//! - [`PostgresDialect`]: ledger SQL syntax
//! - [`PostgresConn`]: ledger connection over deadpool-postgres

mod conn;
mod dialect;

pub use conn::PostgresConn;
pub use dialect::PostgresDialect;

use crate::core::catalog::DriverCatalog;
use crate::core::traits::Conn;

/// Registry key of this driver.
pub const DRIVER_NAME: &str = "postgres";

/// Register the PostgreSQL driver.
pub fn register(catalog: &mut DriverCatalog) {
    catalog.register(DRIVER_NAME, |env| {
        PostgresConn::new(env).map(|c| Box::new(c) as Box<dyn Conn>)
    });
}
