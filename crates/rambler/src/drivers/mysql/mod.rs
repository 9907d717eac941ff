//! MySQL/MariaDB database driver.
//!
//! - [`MysqlDialect`]: ledger SQL syntax
//! - [`MysqlConn`]: ledger connection over a mysql_async pool
//!
//! # Feature Flag
//!
//! This module is only available when the `mysql` feature is enabled
//! (on by default).
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod conn;
mod dialect;

pub use conn::MysqlConn;
pub use dialect::MysqlDialect;

use crate::core::catalog::DriverCatalog;
use crate::core::traits::Conn;

/// Registry key of this driver.
pub const DRIVER_NAME: &str = "mysql";

/// Register the MySQL driver.
pub fn register(catalog: &mut DriverCatalog) {
    catalog.register(DRIVER_NAME, |env| {
        MysqlConn::new(env).map(|c| Box::new(c) as Box<dyn Conn>)
    });
}
