//! Configuration loading and environment resolution.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;
use tracing::debug;

/// Prefix of the environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "RAMBLER_";

impl Config {
    /// Load configuration from a YAML (or JSON) file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Resolve an environment, applying `RAMBLER_*` process variables.
    pub fn environment(&self, name: &str) -> Result<Environment> {
        self.environment_with(name, |key| std::env::var(key).ok())
    }

    /// Resolve an environment with an explicit variable lookup.
    ///
    /// Layers, lowest to highest priority: the default environment, the named
    /// environment, then variables.
    pub fn environment_with<F>(&self, name: &str, lookup: F) -> Result<Environment>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut raw = self.default.clone();
        if name != DEFAULT_ENVIRONMENT {
            let named = self.environments.get(name).ok_or_else(|| {
                MigrateError::Config(format!("unknown environment '{}'", name))
            })?;
            raw = raw.overlay(named);
        }
        raw = raw.overlay(&raw_from_vars(lookup)?);
        debug!("Resolved raw environment {}: {:?}", name, raw);

        let env = resolve(name, raw)?;
        validation::validate(&env)?;
        Ok(env)
    }

    /// Names of the environments defined in this configuration.
    pub fn environment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = std::iter::once(DEFAULT_ENVIRONMENT)
            .chain(self.environments.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

fn raw_from_vars<F>(lookup: F) -> Result<RawEnvironment>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |field: &str| lookup(&format!("{}{}", ENV_PREFIX, field));

    let port = match var("PORT") {
        Some(p) => Some(p.trim().parse::<u64>().map_err(|_| {
            MigrateError::Config(format!("{}PORT must be an integer, got '{}'", ENV_PREFIX, p))
        })?),
        None => None,
    };

    Ok(RawEnvironment {
        driver: var("DRIVER"),
        protocol: var("PROTOCOL"),
        host: var("HOST"),
        port,
        user: var("USER"),
        password: var("PASSWORD"),
        database: var("DATABASE"),
        schema: var("SCHEMA"),
        directory: var("DIRECTORY").map(Into::into),
        table: var("TABLE"),
        ssl_mode: var("SSL_MODE"),
        ca_cert: var("CA_CERT").map(Into::into),
    })
}

/// Fill in defaults. Fails only on values that cannot be represented.
fn resolve(name: &str, raw: RawEnvironment) -> Result<Environment> {
    let driver = raw
        .driver
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| MigrateError::Config("driver is required".into()))?;

    let port = match raw.port {
        Some(p) => u16::try_from(p)
            .map_err(|_| MigrateError::Config(format!("port {} is out of range", p)))?,
        None => default_port(&driver).unwrap_or(0),
    };

    let database = raw.database.unwrap_or_default();
    let schema = raw
        .schema
        .unwrap_or_else(|| default_schema(&driver, &database));

    // A configured CA implies certificate verification unless a mode is given.
    let ssl_mode = match (&raw.ssl_mode, &raw.ca_cert) {
        (Some(mode), _) => mode.to_lowercase(),
        (None, Some(_)) => "verify-full".to_string(),
        (None, None) => "disable".to_string(),
    };

    Ok(Environment {
        name: name.to_string(),
        protocol: raw
            .protocol
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string())
            .to_lowercase(),
        host: raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
        user: raw.user.unwrap_or_default(),
        password: raw.password.unwrap_or_default(),
        database,
        schema,
        directory: raw.directory.unwrap_or_else(|| DEFAULT_DIRECTORY.into()),
        table: raw.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        ssl_mode,
        ca_cert: raw.ca_cert,
        driver,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"
driver: mysql
host: db.internal
user: app
password: secret
database: app
directory: migrations
environments:
  testing:
    database: app_test
  staging:
    driver: postgres
    host: pg.internal
    ca_cert: /etc/ssl/staging-ca.pem
"#;

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_environment_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let env = config.environment_with("default", no_vars).unwrap();

        assert_eq!(env.driver, "mysql");
        assert_eq!(env.protocol, "tcp");
        assert_eq!(env.host, "db.internal");
        assert_eq!(env.port, 3306);
        assert_eq!(env.schema, "app");
        assert_eq!(env.table, "migrations");
        assert_eq!(env.ssl_mode, "disable");
        assert_eq!(env.directory, PathBuf::from("migrations"));
        assert!(env.ca_cert.is_none());
    }

    #[test]
    fn test_named_environment_overrides_default() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let env = config.environment_with("testing", no_vars).unwrap();
        assert_eq!(env.name, "testing");
        assert_eq!(env.database, "app_test");
        assert_eq!(env.host, "db.internal");
        assert_eq!(env.schema, "app_test");
    }

    #[test]
    fn test_ca_cert_enables_verification() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let env = config.environment_with("staging", no_vars).unwrap();
        assert_eq!(env.driver, "postgres");
        assert_eq!(env.port, 5432);
        assert_eq!(env.schema, "public");
        assert_eq!(env.ssl_mode, "verify-full");
        assert_eq!(env.ca_cert, Some(PathBuf::from("/etc/ssl/staging-ca.pem")));
    }

    #[test]
    fn test_variables_take_precedence() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let vars: HashMap<&str, &str> = [
            ("RAMBLER_DATABASE", "from_env"),
            ("RAMBLER_PORT", "13306"),
            ("RAMBLER_TABLE", "schema_history"),
        ]
        .into_iter()
        .collect();

        let env = config
            .environment_with("testing", |k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(env.database, "from_env");
        assert_eq!(env.port, 13306);
        assert_eq!(env.table, "schema_history");
    }

    #[test]
    fn test_invalid_port_variable() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let result = config.environment_with("default", |k| {
            (k == "RAMBLER_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_port_out_of_range() {
        let config =
            Config::from_yaml("driver: mysql\nuser: a\ndatabase: b\nport: 70000\n").unwrap();
        assert!(config.environment_with("default", no_vars).is_err());
    }

    #[test]
    fn test_unknown_environment() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let err = config.environment_with("production", no_vars).unwrap_err();
        assert!(err.to_string().contains("unknown environment 'production'"));
    }

    #[test]
    fn test_missing_driver() {
        let config = Config::from_yaml("host: localhost\n").unwrap();
        let err = config.environment_with("default", no_vars).unwrap_err();
        assert!(err.to_string().contains("driver is required"));
    }

    #[test]
    fn test_json_is_accepted() {
        let config = Config::from_yaml(
            r#"{"driver": "mssql", "user": "sa", "database": "app", "port": 11433}"#,
        )
        .unwrap();
        let env = config.environment_with("default", no_vars).unwrap();
        assert_eq!(env.port, 11433);
        assert_eq!(env.schema, "dbo");
    }

    #[test]
    fn test_environment_names() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.environment_names(), vec!["default", "staging", "testing"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.environments.len(), 2);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let env = config.environment_with("default", no_vars).unwrap();

        for output in [format!("{:?}", env), format!("{:?}", config.default)] {
            assert!(output.contains("[REDACTED]"));
            assert!(!output.contains("secret"));
        }
    }
}
