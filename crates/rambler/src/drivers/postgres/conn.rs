//! PostgreSQL ledger connection.
//!
//! Uses deadpool-postgres with a single connection; TLS through rustls.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info, warn};

use crate::config::Environment;
use crate::core::traits::{Conn, LedgerDialect};
use crate::drivers::common::TlsBuilder;
use crate::error::{MigrateError, Result};

use super::dialect::PostgresDialect;

/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection to a PostgreSQL database, bound to one ledger table.
pub struct PostgresConn {
    pool: Pool,
    schema: String,
    table: String,
    dialect: PostgresDialect,
}

impl PostgresConn {
    /// Create a PostgreSQL connection from a resolved environment.
    ///
    /// The pool is built lazily; no connection is opened here.
    pub fn new(env: &Environment) -> Result<Self> {
        let pg_config = Self::build_config(env);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = match TlsBuilder::from_env(env)?.build_postgres()? {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
            }
            Some(connector) => Manager::from_config(pg_config, connector, mgr_config),
        };

        let pool = Pool::builder(mgr)
            .max_size(1)
            .build()
            .map_err(|e| MigrateError::pool(e, "creating PostgreSQL pool"))?;

        info!(
            "Configured PostgreSQL connection: {}:{}/{} (ledger {}.{})",
            env.host, env.port, env.database, env.schema, env.table
        );

        Ok(Self {
            pool,
            schema: env.schema.clone(),
            table: env.table.clone(),
            dialect: PostgresDialect::new(),
        })
    }

    fn build_config(env: &Environment) -> PgConfig {
        let mut pg_config = PgConfig::new();
        // A host starting with '/' is treated as a unix socket directory.
        pg_config.host(&env.host);
        pg_config.port(env.port);
        pg_config.dbname(&env.database);
        pg_config.user(&env.user);
        pg_config.password(&env.password);
        pg_config.application_name("rambler");

        // Connection options for reliability
        pg_config.keepalives(true);
        pg_config.keepalives_idle(Duration::from_secs(30));
        pg_config.connect_timeout(CONNECT_TIMEOUT);
        pg_config
    }

    async fn client(&self, context: &str) -> Result<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, context))
    }
}

#[async_trait]
impl Conn for PostgresConn {
    async fn has_table(&self) -> Result<bool> {
        let client = self.client("checking PostgreSQL ledger table").await?;
        let row = client
            .query_opt(
                &self.dialect.table_exists_query(),
                &[&self.schema, &self.table],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn create_table(&self) -> Result<()> {
        let sql = self.dialect.create_table_sql(&self.schema, &self.table);
        debug!("Creating PostgreSQL ledger table: {}", sql);
        let client = self.client("creating PostgreSQL ledger table").await?;
        client.batch_execute(&sql).await?;
        Ok(())
    }

    async fn get_applied(&self) -> Result<Vec<String>> {
        let sql = self.dialect.select_applied_sql(&self.schema, &self.table);
        let client = self.client("reading PostgreSQL ledger").await?;
        let rows = client.query(&sql, &[]).await?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    async fn add_applied(&self, migration: &str) -> Result<()> {
        let sql = self.dialect.insert_applied_sql(&self.schema, &self.table);
        let client = self.client("recording PostgreSQL migration").await?;
        client.execute(&sql, &[&migration]).await?;
        Ok(())
    }

    async fn remove_applied(&self, migration: &str) -> Result<u64> {
        let sql = self.dialect.delete_applied_sql(&self.schema, &self.table);
        let client = self.client("removing PostgreSQL migration").await?;
        let deleted = client.execute(&sql, &[&migration]).await?;
        Ok(deleted)
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        let client = self.client("executing PostgreSQL statement").await?;
        client.batch_execute(statement).await?;
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment {
            name: "default".to_string(),
            driver: "postgres".to_string(),
            protocol: "tcp".to_string(),
            host: "pg.internal".to_string(),
            port: 5433,
            user: "app".to_string(),
            password: "secret".to_string(),
            database: "app".to_string(),
            schema: "public".to_string(),
            directory: ".".into(),
            table: "migrations".to_string(),
            ssl_mode: "disable".to_string(),
            ca_cert: None,
        }
    }

    #[test]
    fn test_build_config() {
        let config = PostgresConn::build_config(&env());
        assert_eq!(config.get_ports(), &[5433]);
        assert_eq!(config.get_dbname(), Some("app"));
        assert_eq!(config.get_user(), Some("app"));
        assert_eq!(config.get_connect_timeout(), Some(&CONNECT_TIMEOUT));
    }

    #[test]
    fn test_missing_ca_is_tls_error() {
        let mut env = env();
        env.ssl_mode = "verify-full".to_string();
        env.ca_cert = Some("/nonexistent/ca.pem".into());
        assert!(matches!(PostgresConn::new(&env), Err(MigrateError::Tls(_))));
    }

    #[test]
    fn test_require_still_reads_ca() {
        let mut env = env();
        env.ssl_mode = "require".to_string();
        env.ca_cert = Some("/nonexistent/ca.pem".into());
        assert!(matches!(PostgresConn::new(&env), Err(MigrateError::Tls(_))));
    }
}
