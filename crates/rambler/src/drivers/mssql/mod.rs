//! Microsoft SQL Server database driver.
//!
//! - [`MssqlDialect`]: ledger SQL syntax
//! - [`MssqlConn`]: ledger connection over a bb8/Tiberius pool

mod conn;
mod dialect;

pub use conn::MssqlConn;
pub use dialect::MssqlDialect;

use crate::core::catalog::DriverCatalog;
use crate::core::traits::Conn;

/// Registry key of this driver.
pub const DRIVER_NAME: &str = "mssql";

/// Register the SQL Server driver.
pub fn register(catalog: &mut DriverCatalog) {
    catalog.register(DRIVER_NAME, |env| {
        MssqlConn::new(env).map(|c| Box::new(c) as Box<dyn Conn>)
    });
}
