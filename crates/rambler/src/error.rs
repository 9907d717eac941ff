//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No driver registered under the requested kind
    #[error("Driver not found: '{0}'")]
    DriverNotFound(String),

    /// Trust material could not be loaded or parsed
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// MySQL driver error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQL Server driver error
    #[cfg(feature = "mssql")]
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// The ledger table could not be checked, created or read
    #[error("Ledger bootstrap failed")]
    Bootstrap {
        #[source]
        source: Box<MigrateError>,
    },

    /// A migration body failed to execute
    #[error("Migration {migration} failed to execute")]
    Execution {
        migration: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// A migration ran but its ledger row could not be written or removed
    #[error("Ledger update failed for migration {migration}")]
    Ledger {
        migration: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Ledger rows with no matching migration in the current list
    #[error("Applied migrations missing from the migration list: {}", .0.join(", "))]
    MissingMigrations(Vec<String>),

    /// The same identifier appears twice in the migration list
    #[error("Duplicate migration identifier: {0}")]
    DuplicateMigration(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    pub fn bootstrap(source: MigrateError) -> Self {
        MigrateError::Bootstrap {
            source: Box::new(source),
        }
    }

    pub fn execution(migration: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::Execution {
            migration: migration.into(),
            source: Box::new(source),
        }
    }

    pub fn ledger(migration: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::Ledger {
            migration: migration.into(),
            source: Box::new(source),
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::DriverNotFound(_)
            | MigrateError::Tls(_)
            | MigrateError::Yaml(_)
            | MigrateError::Json(_)
            | MigrateError::DuplicateMigration(_) => 1,
            MigrateError::Bootstrap { .. } | MigrateError::Pool { .. } => 2,
            #[cfg(feature = "mysql")]
            MigrateError::Mysql(_) => 2,
            #[cfg(feature = "postgres")]
            MigrateError::Postgres(_) => 2,
            #[cfg(feature = "mssql")]
            MigrateError::Mssql(_) => 2,
            MigrateError::Execution { .. } => 3,
            MigrateError::Ledger { .. } | MigrateError::MissingMigrations(_) => 4,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
