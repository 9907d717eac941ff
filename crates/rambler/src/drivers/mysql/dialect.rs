//! MySQL/MariaDB ledger dialect (Strategy pattern).

use crate::core::traits::LedgerDialect;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // MySQL uses backticks for identifier quoting
        format!("`{}`", name.replace('`', "``"))
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn table_exists_query(&self) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = ? AND table_name = ?"
            .to_string()
    }

    fn create_table_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "CREATE TABLE {} ( migration VARCHAR(255) NOT NULL, PRIMARY KEY (migration) ) \
             DEFAULT CHARSET=utf8mb4",
            self.ledger_table(schema, table)
        )
    }
}
