//! The migration history table.
//!
//! The [`MigrationRecorder`] owns one row per migration artifact:
//! `(id, name, applied_at)`. A row is inserted with `applied_at = NULL` when
//! the artifact is generated, stamped when the migration is applied, and
//! cleared again when it is rolled back.

use chrono::NaiveDateTime;
use strata_backends::DatabaseBackend;
use strata_core::settings::Engine;
use strata_core::StrataResult;
use strata_schema::Value;

/// One row of the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: i64,
    pub name: String,
    pub applied_at: Option<NaiveDateTime>,
}

impl HistoryRow {
    pub const fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Reads and writes the migration history table.
#[derive(Debug, Clone)]
pub struct MigrationRecorder {
    table: String,
}

impl MigrationRecorder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// The history table's name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the DDL that creates the history table for `engine`.
    pub fn ensure_schema_sql(&self, engine: Engine) -> String {
        match engine {
            Engine::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (\
                    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
                    \"name\" VARCHAR(255) NOT NULL UNIQUE, \
                    \"applied_at\" DATETIME NULL\
                )",
                self.table
            ),
            Engine::Mysql => format!(
                "CREATE TABLE IF NOT EXISTS `{}` (\
                    `id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY, \
                    `name` VARCHAR(255) NOT NULL UNIQUE, \
                    `applied_at` DATETIME NULL\
                ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
                self.table
            ),
        }
    }

    fn quoted(&self, engine: Engine) -> String {
        match engine {
            Engine::Sqlite => format!("\"{}\"", self.table),
            Engine::Mysql => format!("`{}`", self.table),
        }
    }

    /// Creates the history table if it does not exist yet.
    pub async fn ensure_table(&self, backend: &dyn DatabaseBackend) -> StrataResult<()> {
        backend
            .execute(&self.ensure_schema_sql(backend.engine()), &[])
            .await?;
        Ok(())
    }

    /// Returns `true` if the history table exists.
    pub async fn exists(&self, backend: &dyn DatabaseBackend) -> StrataResult<bool> {
        let sql = match backend.engine() {
            Engine::Sqlite => {
                "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
            Engine::Mysql => {
                "SELECT COUNT(*) AS n FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?"
            }
        };
        let count: i64 = backend
            .query_one(sql, &[Value::from(self.table.as_str())])
            .await?
            .get("n")?;
        Ok(count > 0)
    }

    /// Returns every history row ordered by id.
    pub async fn rows(&self, backend: &dyn DatabaseBackend) -> StrataResult<Vec<HistoryRow>> {
        let sql = format!(
            "SELECT id, name, applied_at FROM {} ORDER BY id",
            self.quoted(backend.engine())
        );
        backend
            .query(&sql, &[])
            .await?
            .iter()
            .map(|row| {
                Ok(HistoryRow {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    applied_at: row.get("applied_at")?,
                })
            })
            .collect()
    }

    /// Inserts a pending row for a newly generated migration.
    pub async fn record(&self, backend: &dyn DatabaseBackend, name: &str) -> StrataResult<()> {
        let sql = format!(
            "INSERT INTO {} (name, applied_at) VALUES (?, NULL)",
            self.quoted(backend.engine())
        );
        backend.execute(&sql, &[Value::from(name)]).await?;
        tracing::debug!(migration = name, "Recorded migration");
        Ok(())
    }

    /// Stamps `name` as applied at `at`.
    pub async fn mark_applied(
        &self,
        backend: &dyn DatabaseBackend,
        name: &str,
        at: NaiveDateTime,
    ) -> StrataResult<()> {
        let sql = format!(
            "UPDATE {} SET applied_at = ? WHERE name = ?",
            self.quoted(backend.engine())
        );
        backend
            .execute(&sql, &[Value::DateTime(at), Value::from(name)])
            .await?;
        Ok(())
    }

    /// Clears `name`'s `applied_at`.
    pub async fn mark_unapplied(&self, backend: &dyn DatabaseBackend, name: &str) -> StrataResult<()> {
        let sql = format!(
            "UPDATE {} SET applied_at = NULL WHERE name = ?",
            self.quoted(backend.engine())
        );
        backend.execute(&sql, &[Value::from(name)]).await?;
        Ok(())
    }
}

impl Default for MigrationRecorder {
    fn default() -> Self {
        Self::new("strata_migrations")
    }
}
