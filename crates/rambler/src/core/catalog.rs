//! Driver catalog for explicit dependency injection.
//!
//! The [`DriverCatalog`] maps a driver kind ("mysql", "postgres", ...) to a
//! factory producing a [`Conn`]. It is built once at start-up and passed by
//! reference to whatever needs to open connections.
//!
//! # Design Rationale
//!
//! - **No global state**: drivers register into an owned value
//! - **Explicit registration**: each compiled-in driver registers itself from
//!   [`DriverCatalog::with_builtins`]
//! - **Testable**: tests build catalogs holding in-memory connections

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::config::Environment;
use crate::error::{MigrateError, Result};

use super::traits::Conn;

/// Factory turning a resolved environment into a connection.
///
/// Factories only validate options and load trust material; they never touch
/// the network.
pub type DriverFactory = Box<dyn Fn(&Environment) -> Result<Box<dyn Conn>> + Send + Sync>;

/// Registry of database drivers keyed by driver kind.
#[derive(Default)]
pub struct DriverCatalog {
    drivers: HashMap<String, DriverFactory>,
}

impl DriverCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with every compiled-in driver registered.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();

        #[cfg(feature = "mysql")]
        crate::drivers::mysql::register(&mut catalog);

        #[cfg(feature = "postgres")]
        crate::drivers::postgres::register(&mut catalog);

        #[cfg(feature = "mssql")]
        crate::drivers::mssql::register(&mut catalog);

        catalog
    }

    /// Register a driver factory by name.
    ///
    /// # Panics
    ///
    /// Panics if a driver is already registered under `name`: a second
    /// registration is a programming error that would silently shadow the
    /// first one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Environment) -> Result<Box<dyn Conn>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.drivers.contains_key(&name) {
            panic!("driver '{}' is already registered", name);
        }
        debug!("Registered driver: {}", name);
        self.drivers.insert(name, Box::new(factory));
    }

    /// Open a connection with the driver registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DriverNotFound`] for unknown names, or whatever
    /// configuration error the factory reports.
    pub fn connect(&self, name: &str, env: &Environment) -> Result<Box<dyn Conn>> {
        let factory = self
            .drivers
            .get(name)
            .ok_or_else(|| MigrateError::DriverNotFound(name.to_string()))?;
        factory(env)
    }

    /// Open a connection with the driver named by the environment.
    pub fn connect_env(&self, env: &Environment) -> Result<Box<dyn Conn>> {
        self.connect(&env.driver, env)
    }

    /// Check if a driver is registered.
    pub fn has_driver(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Registered driver names, sorted.
    pub fn driver_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for DriverCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverCatalog")
            .field("drivers", &self.driver_names())
            .finish()
    }
}
