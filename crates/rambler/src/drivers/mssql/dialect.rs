//! Microsoft SQL Server ledger dialect (Strategy pattern).

use crate::core::traits::LedgerDialect;

/// SQL Server dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new SQL Server dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // SQL Server uses square brackets; a closing bracket is doubled
        format!("[{}]", name.replace(']', "]]"))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    fn table_exists_query(&self) -> String {
        "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2"
            .to_string()
    }

    fn create_table_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "CREATE TABLE {} ( migration NVARCHAR(255) NOT NULL, PRIMARY KEY (migration) )",
            self.ledger_table(schema, table)
        )
    }
}
