//! PostgreSQL ledger dialect (Strategy pattern).

use crate::core::traits::LedgerDialect;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // PostgreSQL uses double quotes for identifier quoting
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn table_exists_query(&self) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = $1 AND table_name = $2"
            .to_string()
    }

    fn create_table_sql(&self, schema: &str, table: &str) -> String {
        format!(
            "CREATE TABLE {} ( migration VARCHAR(255) NOT NULL, PRIMARY KEY (migration) )",
            self.ledger_table(schema, table)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("migrations"), "\"migrations\"");
        assert_eq!(dialect.quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_param_placeholder() {
        assert_eq!(PostgresDialect::new().param_placeholder(1), "$1");
        assert_eq!(PostgresDialect::new().param_placeholder(2), "$2");
    }

    #[test]
    fn test_create_table_sql() {
        let sql = PostgresDialect::new().create_table_sql("public", "migrations");
        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"migrations\" ( migration VARCHAR(255) NOT NULL, PRIMARY KEY (migration) )"
        );
    }

    #[test]
    fn test_ledger_statements() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.insert_applied_sql("public", "migrations"),
            "INSERT INTO \"public\".\"migrations\" (migration) VALUES ($1)"
        );
        assert_eq!(
            dialect.delete_applied_sql("public", "migrations"),
            "DELETE FROM \"public\".\"migrations\" WHERE migration = $1"
        );
    }
}
