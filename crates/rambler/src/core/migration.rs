//! Migration records and their lifecycle states.

use serde::Serialize;
use std::fmt;

/// A named, ordered pair of forward and reverse SQL bodies.
///
/// Each body is a list of statements executed one at a time. `up` runs in
/// order; `down` is stored in the order it must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    id: String,
    up: Vec<String>,
    down: Vec<String>,
}

impl Migration {
    /// Create a migration with a single up and down statement.
    ///
    /// Blank bodies produce no statements.
    pub fn new(id: impl Into<String>, up: impl Into<String>, down: impl Into<String>) -> Self {
        Self::with_statements(id, vec![up.into()], vec![down.into()])
    }

    /// Create a migration from statement lists, dropping blank statements.
    pub fn with_statements(id: impl Into<String>, up: Vec<String>, down: Vec<String>) -> Self {
        let keep = |s: Vec<String>| -> Vec<String> {
            s.into_iter().filter(|st| !st.trim().is_empty()).collect()
        };
        Self {
            id: id.into(),
            up: keep(up),
            down: keep(down),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Statements to apply the migration.
    pub fn up(&self) -> &[String] {
        &self.up
    }

    /// Statements to reverse the migration, in execution order.
    pub fn down(&self) -> &[String] {
        &self.down
    }
}

/// Where a migration stands relative to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// In the migration list, absent from the ledger.
    Pending,
    /// Recorded in the ledger.
    Applied,
    /// In the ledger but missing from the migration list.
    Orphaned,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Pending => "pending",
            MigrationState::Applied => "applied",
            MigrationState::Orphaned => "orphaned",
        };
        f.write_str(s)
    }
}
