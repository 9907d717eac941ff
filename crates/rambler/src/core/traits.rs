//! Core traits for database-agnostic migration tracking.
//!
//! - [`Conn`]: the capability set every database backend provides to the engine
//! - [`LedgerDialect`]: SQL text strategy for the ledger table of one engine
//!
//! # Design Patterns
//!
//! - **Strategy**: `LedgerDialect` isolates SQL syntax differences
//! - **Template Method**: default `LedgerDialect` methods build statements from
//!   `quote_ident`, `ledger_table` and `param_placeholder`

use async_trait::async_trait;

use crate::error::Result;

/// A live connection to one database/schema, bound to one ledger table.
///
/// Every call is awaited to completion before the engine issues the next one.
/// Implementations own all dialect-specific SQL.
#[async_trait]
pub trait Conn: Send + Sync {
    /// Whether the ledger table exists in the bound schema.
    ///
    /// An absent table is `Ok(false)`; only genuine query or connectivity
    /// failures are errors.
    async fn has_table(&self) -> Result<bool>;

    /// Create the ledger table (single `migration` primary-key column).
    ///
    /// Only called after [`has_table`](Conn::has_table) returned false; fails
    /// if the table already exists.
    async fn create_table(&self) -> Result<()>;

    /// All ledger entries, ascending by identifier.
    async fn get_applied(&self) -> Result<Vec<String>>;

    /// Record a migration as applied. Fails on a duplicate identifier.
    async fn add_applied(&self, migration: &str) -> Result<()>;

    /// Remove a migration from the ledger, returning the number of rows deleted.
    async fn remove_applied(&self, migration: &str) -> Result<u64>;

    /// Run one arbitrary statement. Driver errors are returned as-is.
    async fn execute(&self, statement: &str) -> Result<()>;

    /// Registered name of the driver behind this connection.
    fn driver_name(&self) -> &'static str;
}

/// SQL syntax for the ledger table of one database engine.
pub trait LedgerDialect: Send + Sync {
    /// Dialect name (matches the driver registration key).
    fn name(&self) -> &str;

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String;

    /// Query returning one row when `table` exists in `schema`.
    ///
    /// Binds the schema as the first parameter and the table as the second.
    fn table_exists_query(&self) -> String;

    /// `CREATE TABLE` statement for the ledger.
    fn create_table_sql(&self, schema: &str, table: &str) -> String;

    /// Schema-qualified, quoted ledger table name.
    fn ledger_table(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
    }

    /// Select every ledger entry in ascending order.
    fn select_applied_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "SELECT migration FROM {} ORDER BY migration ASC",
            self.ledger_table(schema, table)
        )
    }

    /// Insert one ledger entry (one parameter).
    fn insert_applied_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "INSERT INTO {} (migration) VALUES ({})",
            self.ledger_table(schema, table),
            self.param_placeholder(1)
        )
    }

    /// Delete one ledger entry (one parameter).
    fn delete_applied_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "DELETE FROM {} WHERE migration = {}",
            self.ledger_table(schema, table),
            self.param_placeholder(1)
        )
    }
}
