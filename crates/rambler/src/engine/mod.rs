//! Migration engine.
//!
//! The [`Engine`] owns one connection and the ordered migration list. It
//! computes what is pending, runs statements one at a time and updates the
//! ledger only after the statements of a migration have all succeeded.
//!
//! # Failure handling
//!
//! - Ledger bootstrap failures (checking, creating or reading the table) are
//!   returned as [`MigrateError::Bootstrap`]; nothing runs.
//! - A failing statement or ledger update stops the run. The report carries
//!   the failing migration, the [`Phase`] and the underlying error.
//! - Reversing a migration whose definition is gone returns
//!   [`MigrateError::MissingMigrations`] before anything runs.

mod report;

pub use report::{
    Limit, MigrationOutcome, Operation, Outcome, Phase, RunFailure, RunReport, StatusEntry,
    StatusReport,
};

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::core::{Conn, Migration, MigrationState};
use crate::error::{MigrateError, Result};

/// Applies and reverses an ordered list of migrations against one database.
pub struct Engine {
    conn: Box<dyn Conn>,
    migrations: Vec<Migration>,
}

impl Engine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateMigration`] if an identifier appears
    /// more than once in `migrations`.
    pub fn new(conn: Box<dyn Conn>, migrations: Vec<Migration>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(migrations.len());
        for migration in &migrations {
            if !seen.insert(migration.id()) {
                return Err(MigrateError::DuplicateMigration(migration.id().to_string()));
            }
        }
        Ok(Self { conn, migrations })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn driver_name(&self) -> &'static str {
        self.conn.driver_name()
    }

    /// Create the ledger table if it does not exist yet.
    pub async fn ensure_ledger(&self) -> Result<()> {
        let exists = self
            .conn
            .has_table()
            .await
            .map_err(MigrateError::bootstrap)?;
        if !exists {
            info!("Creating ledger table ({})", self.conn.driver_name());
            self.conn
                .create_table()
                .await
                .map_err(MigrateError::bootstrap)?;
        }
        Ok(())
    }

    async fn applied(&self) -> Result<Vec<String>> {
        self.conn
            .get_applied()
            .await
            .map_err(MigrateError::bootstrap)
    }

    /// Ledger rows with no migration in the list.
    fn orphans(&self, applied: &[String]) -> Vec<String> {
        let known: HashSet<&str> = self.migrations.iter().map(Migration::id).collect();
        applied
            .iter()
            .filter(|id| !known.contains(id.as_str()))
            .cloned()
            .collect()
    }

    fn find(&self, id: &str) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.id() == id)
    }

    /// Apply pending migrations in list order.
    ///
    /// Stops at the first failure; migrations after it are never attempted.
    pub async fn apply(&self, limit: Limit) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new(Operation::Apply);

        self.ensure_ledger().await?;
        let applied: HashSet<String> = self.applied().await?.into_iter().collect();

        let mut ledger: Vec<String> = applied.iter().cloned().collect();
        ledger.sort();
        report.orphaned = self.orphans(&ledger);
        warn_orphans(&report.orphaned);

        let mut done = 0;
        for migration in &self.migrations {
            if applied.contains(migration.id()) {
                report.record(migration.id(), Outcome::Skipped);
                continue;
            }
            if !limit.allows(done) {
                break;
            }

            if let Err(e) = self.run_statements(migration.up()).await {
                warn!("Migration {} failed: {}", migration.id(), e);
                report.fail(
                    migration.id(),
                    Phase::Execute,
                    MigrateError::execution(migration.id(), e),
                );
                break;
            }
            if let Err(e) = self.conn.add_applied(migration.id()).await {
                warn!(
                    "Migration {} ran but could not be recorded: {}",
                    migration.id(),
                    e
                );
                report.fail(
                    migration.id(),
                    Phase::LedgerUpdate,
                    MigrateError::ledger(migration.id(), e),
                );
                break;
            }

            info!("Applied {}", migration.id());
            report.record(migration.id(), Outcome::Applied);
            done += 1;
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Apply finished: {} applied in {:.2}s",
            done, report.duration_seconds
        );
        Ok(report)
    }

    /// Reverse the most recently applied migrations, newest first.
    ///
    /// Asking for more than are applied reverses everything and sets
    /// [`RunReport::truncated`].
    pub async fn reverse(&self, count: Limit) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new(Operation::Reverse);

        self.ensure_ledger().await?;
        let mut applied = self.applied().await?;
        applied.sort();
        report.orphaned = self.orphans(&applied);
        warn_orphans(&report.orphaned);

        let take = match count {
            Limit::All => applied.len(),
            Limit::Count(n) => {
                if n > applied.len() {
                    warn!(
                        "Asked to reverse {} migrations but only {} are applied",
                        n,
                        applied.len()
                    );
                    report.truncated = true;
                }
                n.min(applied.len())
            }
        };
        let selected: Vec<&String> = applied.iter().rev().take(take).collect();

        let mut targets = Vec::with_capacity(selected.len());
        let mut missing = Vec::new();
        for id in selected {
            match self.find(id) {
                Some(migration) => targets.push(migration),
                None => missing.push(id.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(MigrateError::MissingMigrations(missing));
        }

        for migration in targets {
            if let Err(e) = self.run_statements(migration.down()).await {
                warn!("Reversing {} failed: {}", migration.id(), e);
                report.fail(
                    migration.id(),
                    Phase::Execute,
                    MigrateError::execution(migration.id(), e),
                );
                break;
            }
            match self.conn.remove_applied(migration.id()).await {
                Ok(0) => warn!(
                    "Reversed {} but its ledger row was already gone",
                    migration.id()
                ),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Reversed {} but could not remove its ledger row: {}",
                        migration.id(),
                        e
                    );
                    report.fail(
                        migration.id(),
                        Phase::LedgerUpdate,
                        MigrateError::ledger(migration.id(), e),
                    );
                    break;
                }
            }

            info!("Reversed {}", migration.id());
            report.record(migration.id(), Outcome::Reversed);
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Reverse finished: {} reversed in {:.2}s",
            report.reversed().len(),
            report.duration_seconds
        );
        Ok(report)
    }

    /// Compare the migration list with the ledger without changing anything.
    ///
    /// A missing ledger table is reported as every migration pending.
    pub async fn status(&self) -> Result<StatusReport> {
        let ledger_exists = self
            .conn
            .has_table()
            .await
            .map_err(MigrateError::bootstrap)?;
        let mut applied = if ledger_exists {
            self.applied().await?
        } else {
            Vec::new()
        };
        applied.sort();
        let applied_set: HashSet<&str> = applied.iter().map(String::as_str).collect();

        let mut entries: Vec<StatusEntry> = self
            .migrations
            .iter()
            .map(|m| StatusEntry {
                migration: m.id().to_string(),
                state: if applied_set.contains(m.id()) {
                    MigrationState::Applied
                } else {
                    MigrationState::Pending
                },
            })
            .collect();

        let orphaned = self.orphans(&applied);
        warn_orphans(&orphaned);
        for id in orphaned {
            entries.push(StatusEntry {
                migration: id,
                state: MigrationState::Orphaned,
            });
        }

        Ok(StatusReport {
            ledger_exists,
            entries,
        })
    }

    async fn run_statements(&self, statements: &[String]) -> Result<()> {
        for statement in statements {
            debug!("Executing: {}", statement);
            self.conn.execute(statement).await?;
        }
        Ok(())
    }
}

fn warn_orphans(orphaned: &[String]) {
    for id in orphaned {
        warn!("Migration {} is applied but missing from the migration list", id);
    }
}
