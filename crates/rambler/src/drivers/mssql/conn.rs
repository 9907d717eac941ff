//! SQL Server ledger connection over Tiberius.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::Environment;
use crate::core::traits::{Conn, LedgerDialect};
use crate::drivers::common::{SslMode, TlsBuilder};
use crate::error::{MigrateError, Result};

use super::dialect::MssqlDialect;

const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
struct TiberiusConnectionManager {
    config: Config,
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.config.clone();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;
        tcp.set_nodelay(true).ok();

        let socket = socket2::SockRef::from(&tcp);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(TCP_KEEPALIVE_INTERVAL)
            .with_interval(TCP_KEEPALIVE_INTERVAL);
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            warn!("Failed to set TCP keepalive on SQL Server connection: {}", e);
        }

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Connection to a SQL Server database, bound to one ledger table.
pub struct MssqlConn {
    pool: Pool<TiberiusConnectionManager>,
    schema: String,
    table: String,
    dialect: MssqlDialect,
}

impl MssqlConn {
    /// Create a SQL Server connection from a resolved environment.
    ///
    /// The pool is built unchecked, so the first connection is only opened by
    /// the first ledger operation.
    pub fn new(env: &Environment) -> Result<Self> {
        let config = Self::build_config(env)?;

        // No idle reaper: the pool holds one connection for the length of a run.
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .idle_timeout(None)
            .max_lifetime(None)
            .build_unchecked(TiberiusConnectionManager { config });

        info!(
            "Configured SQL Server connection: {}:{}/{} (ledger {}.{})",
            env.host, env.port, env.database, env.schema, env.table
        );

        Ok(Self {
            pool,
            schema: env.schema.clone(),
            table: env.table.clone(),
            dialect: MssqlDialect::new(),
        })
    }

    fn build_config(env: &Environment) -> Result<Config> {
        if env.protocol != "tcp" {
            return Err(MigrateError::Config(format!(
                "SQL Server only supports the tcp protocol, got '{}'",
                env.protocol
            )));
        }

        let mut config = Config::new();
        config.host(&env.host);
        config.port(env.port);
        config.database(&env.database);
        config.authentication(AuthMethod::sql_server(&env.user, &env.password));
        config.application_name("rambler");

        let tls = TlsBuilder::from_env(env)?;
        match tls.ssl_mode() {
            SslMode::Disable => {
                warn!("SQL Server TLS is disabled. Credentials will be transmitted in plaintext.");
                config.encryption(EncryptionLevel::NotSupported);
            }
            SslMode::Require => {
                config.trust_cert();
                config.encryption(EncryptionLevel::Required);
            }
            SslMode::VerifyCa | SslMode::VerifyFull => {
                // Already validated by from_env; Tiberius reads it again during the handshake.
                if let Some(path) = tls.ca_cert() {
                    config.trust_cert_ca(path.to_string_lossy());
                }
                config.encryption(EncryptionLevel::Required);
            }
        }

        Ok(config)
    }

    async fn get_conn(
        &self,
        context: &str,
    ) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, context))
    }
}

#[async_trait]
impl Conn for MssqlConn {
    async fn has_table(&self) -> Result<bool> {
        let sql = self.dialect.table_exists_query();
        let mut conn = self.get_conn("checking SQL Server ledger table").await?;
        let row = conn
            .query(sql, &[&self.schema, &self.table])
            .await?
            .into_row()
            .await?;
        Ok(row.is_some())
    }

    async fn create_table(&self) -> Result<()> {
        let sql = self.dialect.create_table_sql(&self.schema, &self.table);
        debug!("Creating SQL Server ledger table: {}", sql);
        let mut conn = self.get_conn("creating SQL Server ledger table").await?;
        conn.simple_query(sql).await?.into_results().await?;
        Ok(())
    }

    async fn get_applied(&self) -> Result<Vec<String>> {
        let sql = self.dialect.select_applied_sql(&self.schema, &self.table);
        let mut conn = self.get_conn("reading SQL Server ledger").await?;
        let rows = conn.simple_query(sql).await?.into_first_result().await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get::<&str, _>(0).map(str::to_string))
            .collect())
    }

    async fn add_applied(&self, migration: &str) -> Result<()> {
        let sql = self.dialect.insert_applied_sql(&self.schema, &self.table);
        let migration = migration.to_string();
        let mut conn = self.get_conn("recording SQL Server migration").await?;
        conn.execute(sql, &[&migration]).await?;
        Ok(())
    }

    async fn remove_applied(&self, migration: &str) -> Result<u64> {
        let sql = self.dialect.delete_applied_sql(&self.schema, &self.table);
        let migration = migration.to_string();
        let mut conn = self.get_conn("removing SQL Server migration").await?;
        let result = conn.execute(sql, &[&migration]).await?;
        Ok(result.total())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        let mut conn = self.get_conn("executing SQL Server statement").await?;
        conn.simple_query(statement).await?.into_results().await?;
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "mssql"
    }
}
