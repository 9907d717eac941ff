//! Run and status reports returned by the engine.

use serde::{Serialize, Serializer};

use crate::core::MigrationState;
use crate::error::{MigrateError, Result};

/// How many migrations a run may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    /// Every eligible migration.
    #[default]
    All,
    /// At most this many.
    Count(usize),
}

impl Limit {
    /// Whether another migration may run after `done` have completed.
    pub fn allows(&self, done: usize) -> bool {
        match self {
            Limit::All => true,
            Limit::Count(n) => done < *n,
        }
    }
}

impl From<Option<usize>> for Limit {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Limit::All, Limit::Count)
    }
}

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Apply,
    Reverse,
}

/// Step of a migration during which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Running the migration's statements.
    Execute,
    /// Recording or removing the ledger row after the statements succeeded.
    LedgerUpdate,
}

/// What happened to one migration during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Already applied; nothing to do.
    Skipped,
    Applied,
    Reversed,
    Failed,
}

/// Per-migration entry of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub migration: String,
    pub outcome: Outcome,
}

/// The single failure that stopped a run.
#[derive(Debug, Serialize)]
pub struct RunFailure {
    pub migration: String,
    pub phase: Phase,
    #[serde(serialize_with = "serialize_error")]
    pub error: MigrateError,
}

fn serialize_error<S: Serializer>(
    error: &MigrateError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(error.format_detailed().trim_end())
}

/// Result of an apply or reverse run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub operation: Operation,
    pub outcomes: Vec<MigrationOutcome>,
    pub failure: Option<RunFailure>,
    /// Ledger rows whose migration is missing from the list.
    pub orphaned: Vec<String>,
    /// A reversal asked for more migrations than were applied.
    pub truncated: bool,
    pub duration_seconds: f64,
}

impl RunReport {
    pub(crate) fn new(operation: Operation) -> Self {
        Self {
            operation,
            outcomes: Vec::new(),
            failure: None,
            orphaned: Vec::new(),
            truncated: false,
            duration_seconds: 0.0,
        }
    }

    pub(crate) fn record(&mut self, migration: &str, outcome: Outcome) {
        self.outcomes.push(MigrationOutcome {
            migration: migration.to_string(),
            outcome,
        });
    }

    pub(crate) fn fail(&mut self, migration: &str, phase: Phase, error: MigrateError) {
        self.record(migration, Outcome::Failed);
        self.failure = Some(RunFailure {
            migration: migration.to_string(),
            phase,
            error,
        });
    }

    /// Identifiers with the given outcome, in run order.
    pub fn with_outcome(&self, outcome: Outcome) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == outcome)
            .map(|o| o.migration.as_str())
            .collect()
    }

    pub fn applied(&self) -> Vec<&str> {
        self.with_outcome(Outcome::Applied)
    }

    pub fn reversed(&self) -> Vec<&str> {
        self.with_outcome(Outcome::Reversed)
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One line of a [`StatusReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub migration: String,
    pub state: MigrationState,
}

/// Read-only view of the migration list against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Whether the ledger table exists yet.
    pub ledger_exists: bool,
    /// List entries in list order, then orphaned ledger rows.
    pub entries: Vec<StatusEntry>,
}

impl StatusReport {
    pub fn in_state(&self, state: MigrationState) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.state == state)
            .map(|e| e.migration.as_str())
            .collect()
    }

    pub fn pending(&self) -> Vec<&str> {
        self.in_state(MigrationState::Pending)
    }

    pub fn applied(&self) -> Vec<&str> {
        self.in_state(MigrationState::Applied)
    }

    pub fn orphaned(&self) -> Vec<&str> {
        self.in_state(MigrationState::Orphaned)
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit() {
        assert!(Limit::All.allows(1_000));
        assert!(Limit::Count(2).allows(1));
        assert!(!Limit::Count(2).allows(2));
        assert!(!Limit::Count(0).allows(0));
        assert_eq!(Limit::from(None), Limit::All);
        assert_eq!(Limit::from(Some(3)), Limit::Count(3));
    }

    #[test]
    fn test_failure_serializes_phase_and_error() {
        let mut report = RunReport::new(Operation::Apply);
        report.record("001_init.sql", Outcome::Applied);
        report.fail(
            "002_add_col.sql",
            Phase::LedgerUpdate,
            MigrateError::ledger(
                "002_add_col.sql",
                MigrateError::pool("duplicate key", "recording migration"),
            ),
        );

        assert!(!report.is_success());
        assert_eq!(report.applied(), vec!["001_init.sql"]);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["operation"], "apply");
        assert_eq!(json["outcomes"][1]["outcome"], "failed");
        assert_eq!(json["failure"]["phase"], "ledger-update");
        assert!(json["failure"]["error"]
            .as_str()
            .unwrap()
            .contains("Ledger update failed for migration 002_add_col.sql"));
    }

    #[test]
    fn test_status_filters() {
        let report = StatusReport {
            ledger_exists: true,
            entries: vec![
                StatusEntry {
                    migration: "001".into(),
                    state: MigrationState::Applied,
                },
                StatusEntry {
                    migration: "002".into(),
                    state: MigrationState::Pending,
                },
                StatusEntry {
                    migration: "000_gone".into(),
                    state: MigrationState::Orphaned,
                },
            ],
        };
        assert_eq!(report.applied(), vec!["001"]);
        assert_eq!(report.pending(), vec!["002"]);
        assert_eq!(report.orphaned(), vec!["000_gone"]);
    }
}
