//! The migration runner.
//!
//! [`MigrationRunner`] ties the pipeline to a live database:
//!
//! - [`compare`](MigrationRunner::compare) diffs declared tables against the
//!   schema the recorded history describes (or the live schema when there is
//!   no history yet)
//! - [`generate`](MigrationRunner::generate) writes a new artifact and its
//!   pending history row
//! - [`migrate`](MigrationRunner::migrate) and
//!   [`rollback`](MigrationRunner::rollback) execute rendered scripts
//!
//! ## Execution
//!
//! A script is rendered against the state the history describes just before
//! (forward) or just after (reverse) the migration, split into statements and
//! executed one by one inside a transaction. A `DROP` whose target is already
//! gone is logged and skipped; any other failure rolls the transaction back
//! and surfaces as [`StrataError::StatementExecution`]. On `SQLite` the
//! `foreign_keys` pragma is switched off around the transaction so that table
//! rebuilds can copy rows freely, and restored afterwards.
//!
//! `MySQL` commits DDL implicitly, so there only the history update is truly
//! transactional.

use chrono::NaiveDateTime;
use strata_backends::SharedBackend;
use strata_core::logging::migration_span;
use strata_core::settings::{Engine, MigrationSettings, Settings};
use strata_core::{StrataError, StrataResult};
use strata_dialects::{dialect_for, render_script, SharedDialect};
use strata_schema::{ModelRegistry, Operation, SchemaState, Table};
use tracing::Instrument;

use crate::artifact::{Direction, Migration};
use crate::comparer::{Changes, TableComparer};
use crate::loader::MigrationLoader;
use crate::recorder::{HistoryRow, MigrationRecorder};
use crate::splitter::split_statements;
use crate::state::StateBuilder;

/// One line of [`MigrationRunner::list_migrations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub id: u32,
    pub name: String,
    pub applied_at: Option<NaiveDateTime>,
}

impl MigrationStatus {
    pub const fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// A recorded migration: its artifact joined with its history row.
#[derive(Debug, Clone)]
struct Entry {
    migration: Migration,
    applied_at: Option<NaiveDateTime>,
}

/// Generates, applies, and rolls back migrations against one database.
pub struct MigrationRunner {
    backend: SharedBackend,
    dialect: SharedDialect,
    loader: MigrationLoader,
    recorder: MigrationRecorder,
}

impl MigrationRunner {
    pub fn new(backend: SharedBackend, dialect: SharedDialect, settings: &MigrationSettings) -> Self {
        Self {
            backend,
            dialect,
            loader: MigrationLoader::new(&settings.dir),
            recorder: MigrationRecorder::new(&settings.history_table),
        }
    }

    /// Connects to the configured database and picks its dialect.
    pub fn from_settings(settings: &Settings) -> StrataResult<Self> {
        let backend = strata_backends::connect(&settings.database)?;
        let dialect = dialect_for(backend.engine());
        Ok(Self::new(backend, dialect, &settings.migrations))
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn dialect(&self) -> &SharedDialect {
        &self.dialect
    }

    pub fn loader(&self) -> &MigrationLoader {
        &self.loader
    }

    pub fn recorder(&self) -> &MigrationRecorder {
        &self.recorder
    }

    // ── History ──────────────────────────────────────────────────────

    /// Loads every recorded migration ordered by id.
    ///
    /// Artifact files without a history row (for example ones checked out
    /// from version control) get a pending row first.
    async fn entries(&self) -> StrataResult<Vec<Entry>> {
        let backend = self.backend.as_ref();
        self.recorder.ensure_table(backend).await?;
        let artifacts = self.loader.load()?;
        let mut rows = self.recorder.rows(backend).await?;

        let mut synced = false;
        for migration in &artifacts {
            if !rows.iter().any(|r| r.name == migration.name) {
                self.recorder.record(backend, &migration.name).await?;
                synced = true;
            }
        }
        if synced {
            rows = self.recorder.rows(backend).await?;
        }
        join(rows, &artifacts)
    }

    /// Like `entries`, but never writes to the database: a missing history
    /// table reads as empty and unrecorded artifacts read as pending.
    async fn recorded_entries(&self) -> StrataResult<Vec<Entry>> {
        let backend = self.backend.as_ref();
        let artifacts = self.loader.load()?;
        let mut rows = if self.recorder.exists(backend).await? {
            self.recorder.rows(backend).await?
        } else {
            Vec::new()
        };
        for migration in &artifacts {
            if !rows.iter().any(|r| r.name == migration.name) {
                rows.push(HistoryRow {
                    id: 0,
                    name: migration.name.clone(),
                    applied_at: None,
                });
            }
        }
        join(rows, &artifacts)
    }

    async fn introspect(&self) -> StrataResult<Vec<Table>> {
        self.backend
            .introspect(&[self.recorder.table()])
            .await
    }

    async fn current_state_of(&self, entries: &[Entry]) -> StrataResult<SchemaState> {
        if entries.is_empty() {
            tracing::debug!("No migration history, introspecting the live schema");
            return Ok(SchemaState::from_tables(self.introspect().await?));
        }
        let mut builder = StateBuilder::new();
        for entry in entries {
            builder.replay(&entry.migration)?;
        }
        Ok(builder.into_state())
    }

    /// The schema the recorded history describes, applied or not.
    pub async fn current_state(&self) -> StrataResult<SchemaState> {
        let entries = self.entries().await?;
        self.current_state_of(&entries).await
    }

    /// Lists every recorded migration with its applied time.
    pub async fn list_migrations(&self) -> StrataResult<Vec<MigrationStatus>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|e| MigrationStatus {
                id: e.migration.id,
                name: e.migration.name,
                applied_at: e.applied_at,
            })
            .collect())
    }

    // ── Generation ───────────────────────────────────────────────────

    /// Diffs `desired` against the current schema.
    pub async fn compare(&self, desired: &[Table]) -> StrataResult<Changes> {
        let current = self.current_state().await?;
        TableComparer::new(self.dialect.clone()).compare(current.tables(), desired)
    }

    /// Writes a new migration artifact and records it as pending.
    ///
    /// The first migration of a database that already has tables keeps the
    /// introspected schema as its baseline.
    pub async fn generate(
        &self,
        forward: Vec<Operation>,
        reverse: Vec<Operation>,
    ) -> StrataResult<Migration> {
        if forward.is_empty() {
            return Err(StrataError::EmptyScript(Direction::Forward.to_string()));
        }
        if reverse.is_empty() {
            return Err(StrataError::EmptyScript(Direction::Reverse.to_string()));
        }
        let entries = self.entries().await?;
        let mut migration = Migration::new(self.loader.next_id()?, forward, reverse);
        if entries.is_empty() {
            migration = migration.with_baseline(self.introspect().await?);
        }

        let path = migration.write_to(self.loader.migrations_dir())?;
        self.recorder
            .record(self.backend.as_ref(), &migration.name)
            .await?;
        tracing::info!(
            migration = %migration.name,
            path = %path.display(),
            operations = migration.forward.len(),
            "Generated migration"
        );
        Ok(migration)
    }

    /// Compares the declared models against the current schema and
    /// generates a migration for the difference, if there is one.
    pub async fn make_migration(&self, registry: &ModelRegistry) -> StrataResult<Option<Migration>> {
        let desired = registry.tables()?;
        let changes = self.compare(&desired).await?;
        if changes.is_empty() {
            tracing::info!("No changes detected");
            return Ok(None);
        }
        self.generate(changes.forward, changes.reverse).await.map(Some)
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(
        &self,
        entries: &[Entry],
        migration: &Migration,
        direction: Direction,
    ) -> StrataResult<Vec<String>> {
        let mut builder = StateBuilder::new();
        for entry in entries.iter().filter(|e| e.migration.id < migration.id) {
            builder.replay(&entry.migration)?;
        }
        match direction {
            Direction::Forward if !migration.baseline.is_empty() => {
                builder = StateBuilder::from_state(SchemaState::from_tables(migration.baseline.clone()));
            }
            Direction::Forward => {}
            Direction::Reverse => {
                builder.replay(migration)?;
            }
        }
        let statements = render_script(
            self.dialect.as_ref(),
            migration.operations(direction),
            builder.state(),
        )?;
        Ok(split_statements(&statements.join(";\n")))
    }

    /// Renders a migration's script without executing it or touching the
    /// history table.
    pub async fn sql_for(&self, name: &str, direction: Direction) -> StrataResult<Vec<String>> {
        let entries = self.recorded_entries().await?;
        let entry = find(&entries, name)?;
        self.render(&entries, &entry.migration, direction)
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Applies pending migrations and returns their names in order.
    ///
    /// With no target only the highest-numbered pending migration runs. With
    /// a target every pending migration up to and including it runs.
    pub async fn migrate(&self, target: Option<&str>) -> StrataResult<Vec<String>> {
        let entries = self.entries().await?;
        let pending: Vec<&Entry> = entries.iter().filter(|e| e.applied_at.is_none()).collect();
        let selected: Vec<&Entry> = match target {
            None => {
                if pending.len() > 1 {
                    tracing::warn!(
                        skipped = pending.len() - 1,
                        "Applying only the latest pending migration"
                    );
                }
                pending.last().copied().into_iter().collect()
            }
            Some(name) => {
                let id = find(&entries, name)?.migration.id;
                pending.into_iter().filter(|e| e.migration.id <= id).collect()
            }
        };

        let mut applied = Vec::with_capacity(selected.len());
        for entry in selected {
            self.run(&entries, &entry.migration, Direction::Forward).await?;
            applied.push(entry.migration.name.clone());
        }
        Ok(applied)
    }

    /// Rolls back applied migrations and returns their names in order.
    ///
    /// With no target only the highest-numbered applied migration is rolled
    /// back. With a target every applied migration from the newest down to
    /// and including it is rolled back.
    pub async fn rollback(&self, target: Option<&str>) -> StrataResult<Vec<String>> {
        let entries = self.entries().await?;
        let mut applied: Vec<&Entry> = entries.iter().filter(|e| e.applied_at.is_some()).collect();
        applied.reverse();
        let selected: Vec<&Entry> = match target {
            None => applied.first().copied().into_iter().collect(),
            Some(name) => {
                let id = find(&entries, name)?.migration.id;
                applied.into_iter().filter(|e| e.migration.id >= id).collect()
            }
        };

        let mut reverted = Vec::with_capacity(selected.len());
        for entry in selected {
            self.run(&entries, &entry.migration, Direction::Reverse).await?;
            reverted.push(entry.migration.name.clone());
        }
        Ok(reverted)
    }

    async fn run(
        &self,
        entries: &[Entry],
        migration: &Migration,
        direction: Direction,
    ) -> StrataResult<()> {
        let statements = self.render(entries, migration, direction)?;
        let span = migration_span(&migration.name, direction.as_str());
        async {
            self.execute_script(migration, direction, &statements).await?;
            match direction {
                Direction::Forward => {
                    tracing::info!(statements = statements.len(), "Applied migration");
                }
                Direction::Reverse => {
                    tracing::info!(statements = statements.len(), "Rolled back migration");
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn execute_script(
        &self,
        migration: &Migration,
        direction: Direction,
        statements: &[String],
    ) -> StrataResult<()> {
        let backend = self.backend.as_ref();
        let foreign_keys = self.suspend_foreign_keys().await?;

        let result = async {
            backend.begin().await?;
            for statement in statements {
                match backend.execute(statement, &[]).await {
                    Ok(_) => tracing::debug!(sql = %statement, "Executed"),
                    Err(e) if is_drop(statement) && backend.is_missing_object_error(&e) => {
                        tracing::warn!(sql = %statement, error = %e, "Object already gone, skipping");
                    }
                    Err(e) => return Err(statement_error(statement, e)),
                }
            }
            match direction {
                Direction::Forward => {
                    let now = chrono::Local::now().naive_local();
                    self.recorder.mark_applied(backend, &migration.name, now).await?;
                }
                Direction::Reverse => {
                    self.recorder.mark_unapplied(backend, &migration.name).await?;
                }
            }
            backend.commit().await
        }
        .await;

        if result.is_err() {
            if let Err(e) = backend.rollback().await {
                tracing::debug!(error = %e, "Rollback after failure");
            }
        }
        self.restore_foreign_keys(foreign_keys).await?;
        result
    }

    /// Turns `SQLite` foreign key enforcement off, returning the previous
    /// setting. A no-op elsewhere.
    async fn suspend_foreign_keys(&self) -> StrataResult<Option<bool>> {
        if self.backend.engine() != Engine::Sqlite {
            return Ok(None);
        }
        let enabled: bool = self
            .backend
            .query_one("PRAGMA foreign_keys", &[])
            .await?
            .get_by_index(0)?;
        self.backend.execute("PRAGMA foreign_keys = OFF", &[]).await?;
        Ok(Some(enabled))
    }

    async fn restore_foreign_keys(&self, previous: Option<bool>) -> StrataResult<()> {
        if previous == Some(true) {
            self.backend.execute("PRAGMA foreign_keys = ON", &[]).await?;
        }
        Ok(())
    }
}

/// Pairs history rows with their artifacts, ordered by id.
fn join(rows: Vec<HistoryRow>, artifacts: &[Migration]) -> StrataResult<Vec<Entry>> {
    let mut entries = rows
        .into_iter()
        .map(|row| {
            let migration = artifacts
                .iter()
                .find(|m| m.name == row.name)
                .cloned()
                .ok_or_else(|| StrataError::MigrationNotFound(row.name.clone()))?;
            Ok(Entry {
                migration,
                applied_at: row.applied_at,
            })
        })
        .collect::<StrataResult<Vec<_>>>()?;
    entries.sort_by_key(|e| e.migration.id);
    Ok(entries)
}

fn find<'a>(entries: &'a [Entry], name: &str) -> StrataResult<&'a Entry> {
    entries
        .iter()
        .find(|e| e.migration.name == name)
        .ok_or_else(|| StrataError::MigrationNotFound(name.to_string()))
}

fn is_drop(statement: &str) -> bool {
    let upper = statement.trim_start().to_uppercase();
    upper.starts_with("DROP ") || upper.contains(" DROP ")
}

fn statement_error(statement: &str, err: StrataError) -> StrataError {
    match err {
        StrataError::Database { code, message } | StrataError::StatementExecution { code, message, .. } => {
            StrataError::StatementExecution {
                statement: statement.to_string(),
                code,
                message,
            }
        }
        other => StrataError::StatementExecution {
            statement: statement.to_string(),
            code: other.code(),
            message: other.to_string(),
        },
    }
}
