//! Configuration validation.

use super::Environment;
use crate::drivers::SslMode;
use crate::error::{MigrateError, Result};

/// Validate a resolved environment.
pub fn validate(env: &Environment) -> Result<()> {
    if env.driver.is_empty() {
        return Err(MigrateError::Config("driver is required".into()));
    }

    match env.protocol.as_str() {
        "tcp" | "unix" => {}
        other => {
            return Err(MigrateError::Config(format!(
                "protocol must be 'tcp' or 'unix', got '{}'",
                other
            )))
        }
    }

    if env.host.is_empty() {
        return Err(MigrateError::Config("host is required".into()));
    }
    if env.protocol == "tcp" && env.port == 0 {
        return Err(MigrateError::Config(format!(
            "port is required for driver '{}'",
            env.driver
        )));
    }
    if env.user.is_empty() {
        return Err(MigrateError::Config("user is required".into()));
    }
    if env.database.is_empty() {
        return Err(MigrateError::Config("database is required".into()));
    }
    if env.schema.is_empty() {
        return Err(MigrateError::Config("schema must not be empty".into()));
    }
    if env.table.is_empty() {
        return Err(MigrateError::Config("table must not be empty".into()));
    }

    let ssl_mode = SslMode::parse(&env.ssl_mode)?;
    if env.ca_cert.is_some() && !ssl_mode.verifies_certificate() {
        return Err(MigrateError::Config(format!(
            "ca_cert is set but ssl_mode '{}' does not verify certificates; \
             use verify-ca or verify-full",
            env.ssl_mode
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_env() -> Environment {
        Environment {
            name: "default".to_string(),
            driver: "mysql".to_string(),
            protocol: "tcp".to_string(),
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: "password".to_string(),
            database: "app".to_string(),
            schema: "app".to_string(),
            directory: ".".into(),
            table: "migrations".to_string(),
            ssl_mode: "disable".to_string(),
            ca_cert: None,
        }
    }

    #[test]
    fn test_valid_env() {
        assert!(validate(&valid_env()).is_ok());
    }

    #[test]
    fn test_missing_user() {
        let mut env = valid_env();
        env.user = String::new();
        assert!(validate(&env).is_err());
    }

    #[test]
    fn test_missing_database() {
        let mut env = valid_env();
        env.database = String::new();
        assert!(validate(&env).is_err());
    }

    #[test]
    fn test_unknown_protocol() {
        let mut env = valid_env();
        env.protocol = "udp".to_string();
        assert!(validate(&env).is_err());
    }

    #[test]
    fn test_unix_socket_without_port() {
        let mut env = valid_env();
        env.protocol = "unix".to_string();
        env.host = "/var/run/mysqld/mysqld.sock".to_string();
        env.port = 0;
        assert!(validate(&env).is_ok());
    }

    #[test]
    fn test_tcp_requires_port() {
        let mut env = valid_env();
        env.port = 0;
        assert!(validate(&env).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut env = valid_env();
        env.ssl_mode = "sometimes".to_string();
        assert!(validate(&env).is_err());
    }

    #[test]
    fn test_ca_cert_with_tls_disabled() {
        let mut env = valid_env();
        env.ca_cert = Some("/etc/ssl/ca.pem".into());
        assert!(validate(&env).is_err());

        env.ssl_mode = "verify-ca".to_string();
        assert!(validate(&env).is_ok());
    }

    #[test]
    fn test_ca_cert_with_require_rejected() {
        let mut env = valid_env();
        env.ssl_mode = "require".to_string();
        env.ca_cert = Some("/etc/ssl/ca.pem".into());
        let err = validate(&env).unwrap_err();
        assert!(err.to_string().contains("does not verify certificates"));

        env.ssl_mode = "verify-ca".to_string();
        assert!(validate(&env).is_ok());
    }
}
