//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
///
/// The top-level fields form the default environment; each entry of
/// `environments` overrides it field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default environment.
    #[serde(flatten)]
    pub default: RawEnvironment,

    /// Named environments layered over the default one.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environments: HashMap<String, RawEnvironment>,
}

/// An environment as written in the configuration file.
///
/// Every field is optional so that named environments only need to carry the
/// values they change.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnvironment {
    /// Driver kind ("mysql", "postgres", "mssql").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Transport protocol ("tcp" or "unix").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Database host, or socket path when protocol is "unix".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Schema holding the ledger table (driver default when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Directory containing the migration files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Ledger table name (default: "migrations").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// TLS mode: disable, require, verify-ca, verify-full.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,

    /// PEM file with the certificate authorities to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl RawEnvironment {
    /// Layer `other` over `self`: every field set in `other` wins.
    pub fn overlay(self, other: &RawEnvironment) -> Self {
        let other = other.clone();
        Self {
            driver: other.driver.or(self.driver),
            protocol: other.protocol.or(self.protocol),
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
            database: other.database.or(self.database),
            schema: other.schema.or(self.schema),
            directory: other.directory.or(self.directory),
            table: other.table.or(self.table),
            ssl_mode: other.ssl_mode.or(self.ssl_mode),
            ca_cert: other.ca_cert.or(self.ca_cert),
        }
    }
}

impl fmt::Debug for RawEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawEnvironment")
            .field("driver", &self.driver)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("directory", &self.directory)
            .field("table", &self.table)
            .field("ssl_mode", &self.ssl_mode)
            .field("ca_cert", &self.ca_cert)
            .finish()
    }
}

/// A fully resolved environment, ready to be handed to a driver.
#[derive(Clone, PartialEq, Eq)]
pub struct Environment {
    /// Name of the environment this was resolved from.
    pub name: String,
    pub driver: String,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub schema: String,
    pub directory: PathBuf,
    pub table: String,
    pub ssl_mode: String,
    pub ca_cert: Option<PathBuf>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("directory", &self.directory)
            .field("table", &self.table)
            .field("ssl_mode", &self.ssl_mode)
            .field("ca_cert", &self.ca_cert)
            .finish()
    }
}

pub(crate) const DEFAULT_ENVIRONMENT: &str = "default";
pub(crate) const DEFAULT_PROTOCOL: &str = "tcp";
pub(crate) const DEFAULT_HOST: &str = "localhost";
pub(crate) const DEFAULT_TABLE: &str = "migrations";
pub(crate) const DEFAULT_DIRECTORY: &str = ".";

/// Default port for a driver kind, if the driver is known.
pub fn default_port(driver: &str) -> Option<u16> {
    match driver {
        "mysql" => Some(3306),
        "postgres" => Some(5432),
        "mssql" => Some(1433),
        _ => None,
    }
}

/// Default ledger schema for a driver kind.
///
/// MySQL has no schema level below the database, so the database name is used.
pub fn default_schema(driver: &str, database: &str) -> String {
    match driver {
        "postgres" => "public".to_string(),
        "mssql" => "dbo".to_string(),
        _ => database.to_string(),
    }
}
