//! MySQL/MariaDB ledger connection.
//!
//! Uses a single-connection mysql_async pool so that every statement of a run
//! shares one session.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, SslOpts};
use tracing::{debug, info, warn};

use crate::config::Environment;
use crate::core::traits::{Conn, LedgerDialect};
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{MigrateError, Result};

use super::dialect::MysqlDialect;

/// Connection to a MySQL database, bound to one ledger table.
pub struct MysqlConn {
    pool: Pool,
    schema: String,
    table: String,
    dialect: MysqlDialect,
}

impl MysqlConn {
    /// Create a MySQL connection from a resolved environment.
    ///
    /// No network activity happens here; the pool connects on first use.
    pub fn new(env: &Environment) -> Result<Self> {
        let opts = Self::build_opts(env)?;
        let pool = Pool::new(opts);

        info!(
            "Configured MySQL connection: {}:{}/{} (ledger {}.{})",
            env.host, env.port, env.database, env.schema, env.table
        );

        Ok(Self {
            pool,
            schema: env.schema.clone(),
            table: env.table.clone(),
            dialect: MysqlDialect::new(),
        })
    }

    /// Build connection options, loading trust material if configured.
    fn build_opts(env: &Environment) -> Result<Opts> {
        let tls = TlsBuilder::from_env(env)?;
        let ssl_opts = match tls.ssl_mode() {
            SslMode::Disable => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            SslMode::Require => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            SslMode::VerifyCa => Some(SslOpts::default().with_danger_skip_domain_validation(true)),
            SslMode::VerifyFull => Some(SslOpts::default()),
        };
        let ssl_opts = match (ssl_opts, tls.load_ca_pem()?) {
            (Some(ssl), Some(pem)) => Some(ssl.with_root_certs(vec![pem.into()])),
            (ssl, _) => ssl,
        };

        let mut builder = OptsBuilder::default()
            .user(Some(&env.user))
            .pass(Some(&env.password))
            .db_name(Some(&env.database))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        builder = match env.protocol.as_str() {
            "unix" => builder.socket(Some(&env.host)),
            _ => builder.ip_or_hostname(&env.host).tcp_port(env.port),
        };

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let constraints = PoolConstraints::new(0, 1)
            .ok_or_else(|| MigrateError::Config("invalid MySQL pool constraints".into()))?;
        let pool_opts = PoolOpts::new()
            .with_constraints(constraints)
            .with_reset_connection(false);

        Ok(builder.pool_opts(pool_opts).into())
    }

    async fn get_conn(&self, context: &str) -> Result<mysql_async::Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::pool(e, context))
    }
}

#[async_trait]
impl Conn for MysqlConn {
    async fn has_table(&self) -> Result<bool> {
        let sql = self.dialect.table_exists_query();
        let mut conn = self.get_conn("checking MySQL ledger table").await?;
        let found: Option<String> = conn
            .exec_first(sql.as_str(), (self.schema.as_str(), self.table.as_str()))
            .await?;
        Ok(found.is_some())
    }

    async fn create_table(&self) -> Result<()> {
        let sql = self.dialect.create_table_sql(&self.schema, &self.table);
        debug!("Creating MySQL ledger table: {}", sql);
        let mut conn = self.get_conn("creating MySQL ledger table").await?;
        conn.query_drop(sql.as_str()).await?;
        Ok(())
    }

    async fn get_applied(&self) -> Result<Vec<String>> {
        let sql = self.dialect.select_applied_sql(&self.schema, &self.table);
        let mut conn = self.get_conn("reading MySQL ledger").await?;
        let applied: Vec<String> = conn.query(sql.as_str()).await?;
        Ok(applied)
    }

    async fn add_applied(&self, migration: &str) -> Result<()> {
        let sql = self.dialect.insert_applied_sql(&self.schema, &self.table);
        let mut conn = self.get_conn("recording MySQL migration").await?;
        conn.exec_drop(sql.as_str(), (migration,)).await?;
        Ok(())
    }

    async fn remove_applied(&self, migration: &str) -> Result<u64> {
        let sql = self.dialect.delete_applied_sql(&self.schema, &self.table);
        let mut conn = self.get_conn("removing MySQL migration").await?;
        conn.exec_drop(sql.as_str(), (migration,)).await?;
        Ok(conn.affected_rows())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        let mut conn = self.get_conn("executing MySQL statement").await?;
        conn.query_drop(statement).await?;
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "mysql"
    }
}
