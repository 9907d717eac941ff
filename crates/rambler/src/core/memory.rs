//! In-memory connection used by unit tests.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{MigrateError, Result};

use super::traits::Conn;

/// Observable state behind a [`MemoryConn`].
#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    /// Ledger rows; `None` while the table does not exist.
    pub ledger: Option<BTreeSet<String>>,
    /// Every call in order, e.g. `execute:CREATE ...`, `add:001`, `remove:001`.
    pub events: Vec<String>,
    /// Statements that fail when executed.
    pub failing_statements: Vec<String>,
    /// Identifiers whose ledger insert fails.
    pub failing_adds: Vec<String>,
    /// Identifiers whose row disappears just before the delete, which then
    /// reports zero rows.
    pub vanishing_rows: Vec<String>,
    pub fail_has_table: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryConn {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection whose ledger already holds `applied`.
    pub fn with_applied(applied: &[&str]) -> Self {
        let conn = Self::new();
        conn.state().ledger = Some(applied.iter().map(|s| s.to_string()).collect());
        conn
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn ledger(&self) -> Vec<String> {
        self.state()
            .ledger
            .as_ref()
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    fn failure(message: &str) -> MigrateError {
        MigrateError::pool(message, "memory connection")
    }
}

#[async_trait]
impl Conn for MemoryConn {
    async fn has_table(&self) -> Result<bool> {
        let mut state = self.state();
        state.events.push("has_table".to_string());
        if state.fail_has_table {
            return Err(Self::failure("connection refused"));
        }
        Ok(state.ledger.is_some())
    }

    async fn create_table(&self) -> Result<()> {
        let mut state = self.state();
        state.events.push("create_table".to_string());
        if state.ledger.is_some() {
            return Err(Self::failure("table already exists"));
        }
        state.ledger = Some(BTreeSet::new());
        Ok(())
    }

    async fn get_applied(&self) -> Result<Vec<String>> {
        let state = self.state();
        let ledger = state
            .ledger
            .as_ref()
            .ok_or_else(|| Self::failure("table does not exist"))?;
        Ok(ledger.iter().cloned().collect())
    }

    async fn add_applied(&self, migration: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("add:{}", migration));
        if state.failing_adds.iter().any(|m| m == migration) {
            return Err(Self::failure("ledger insert rejected"));
        }
        let ledger = state
            .ledger
            .as_mut()
            .ok_or_else(|| Self::failure("table does not exist"))?;
        if !ledger.insert(migration.to_string()) {
            return Err(Self::failure("duplicate key"));
        }
        Ok(())
    }

    async fn remove_applied(&self, migration: &str) -> Result<u64> {
        let mut state = self.state();
        state.events.push(format!("remove:{}", migration));
        let ledger = state
            .ledger
            .as_mut()
            .ok_or_else(|| Self::failure("table does not exist"))?;
        let removed = ledger.remove(migration);
        if state.vanishing_rows.iter().any(|m| m == migration) {
            return Ok(0);
        }
        Ok(u64::from(removed))
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("execute:{}", statement));
        if state.failing_statements.iter().any(|s| s == statement) {
            return Err(Self::failure("syntax error"));
        }
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_has_table_then_create() {
        let conn = MemoryConn::new();
        assert!(!conn.has_table().await.unwrap());
        conn.create_table().await.unwrap();
        assert!(conn.has_table().await.unwrap());
        assert!(conn.create_table().await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_add_fails() {
        let conn = MemoryConn::with_applied(&["001"]);
        assert!(conn.add_applied("001").await.is_err());
        assert_eq!(conn.remove_applied("002").await.unwrap(), 0);
    }
}
