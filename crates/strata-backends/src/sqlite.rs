//! `SQLite` database backend using `rusqlite`.
//!
//! [`SqliteBackend`] implements [`DatabaseBackend`] with `rusqlite` wrapped in
//! `tokio::task::spawn_blocking`. The connection sits behind an async
//! `Mutex`, so statements run one at a time on a single session.
//!
//! - WAL mode is enabled for file databases
//! - `:memory:` opens an in-memory database (used throughout the tests)
//! - Foreign key enforcement is on by default

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::types::ValueRef;
use strata_core::settings::Engine;
use strata_core::{StrataError, StrataResult};
use strata_dialects::sqlite::REBUILD_PREFIX;
use strata_schema::{ForeignKey, Index, IndexKind, OnDelete, Table, Value};
use tokio::sync::Mutex;

use crate::base::{column_from_declared, parse_default, DatabaseBackend};
use crate::row::Row;

/// A `SQLite` database backend.
pub struct SqliteBackend {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    conn: Arc<Mutex<rusqlite::Connection>>,
}

fn sqlite_error(e: &rusqlite::Error) -> StrataError {
    let code = match e {
        rusqlite::Error::SqliteFailure(err, _) => Some(i64::from(err.extended_code)),
        _ => None,
    };
    StrataError::Database {
        code,
        message: e.to_string(),
    }
}

fn join_error(e: &tokio::task::JoinError) -> StrataError {
    StrataError::database(format!("Task join error: {e}"))
}

impl SqliteBackend {
    /// Opens a `SQLite` database at the given path.
    ///
    /// If the path is `:memory:`, an in-memory database is created.
    pub fn open(path: impl Into<PathBuf>) -> StrataResult<Self> {
        let path = path.into();
        let memory = path.to_str() == Some(":memory:");
        let conn = if memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| StrataError::database(format!("SQLite open failed: {e}")))?;

        let pragmas = if memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| StrataError::database(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database.
    pub fn memory() -> StrataResult<Self> {
        Self::open(":memory:")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> StrataResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::DateTime(dt) => stmt.raw_bind_parameter(
                    idx,
                    dt.format("%Y-%m-%d %H:%M:%S").to_string().as_str(),
                ),
            }
            .map_err(|e| StrataError::database(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> Row {
        let values = (0..column_names.len())
            .map(|i| match sqlite_row.get_ref(i).unwrap_or(ValueRef::Null) {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Int(v),
                ValueRef::Real(v) => Value::Float(v),
                ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
                ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
            })
            .collect();
        Row::new(column_names.to_vec(), values)
    }

    fn quote(ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    async fn introspect_table(&self, name: &str, create_sql: &str) -> StrataResult<Table> {
        let quoted = Self::quote(name);
        let autoincrement = create_sql.to_uppercase().contains("AUTOINCREMENT");
        let mut table = Table::new(name);

        let columns = self
            .query(&format!("PRAGMA table_info({quoted})"), &[])
            .await?;
        for row in &columns {
            let column_name: String = row.get("name")?;
            let declared: String = row.get("type")?;
            let not_null: bool = row.get("notnull")?;
            let pk: i64 = row.get("pk")?;
            let mut column = column_from_declared(&column_name, &declared, !not_null && pk == 0);
            if let Some(raw) = row.get::<Option<String>>("dflt_value")? {
                column.default = parse_default(&raw, column.column_type);
            }
            if pk == 1 {
                column.auto_increment = autoincrement && column.column_type.is_integer();
                table.indexes.push(Index::primary(&column_name));
            }
            table.fields.push(column);
        }

        let indexes = self
            .query(&format!("PRAGMA index_list({quoted})"), &[])
            .await?;
        for row in &indexes {
            let origin: String = row.get("origin")?;
            if origin == "pk" {
                continue;
            }
            let index_name: String = row.get("name")?;
            let unique: bool = row.get("unique")?;
            let info = self
                .query(&format!("PRAGMA index_info({})", Self::quote(&index_name)), &[])
                .await?;
            // Only single-column indexes are modelled.
            if let [only] = info.as_slice() {
                let field: String = only.get("name")?;
                let kind = if unique {
                    IndexKind::Unique
                } else {
                    IndexKind::Index
                };
                table.indexes.push(Index::new(field, kind));
            }
        }

        let foreign_keys = self
            .query(&format!("PRAGMA foreign_key_list({quoted})"), &[])
            .await?;
        for row in &foreign_keys {
            let ref_table: String = row.get("table")?;
            let from: String = row.get("from")?;
            let to: Option<String> = row.get("to")?;
            let on_delete: String = row.get("on_delete")?;
            let fk = ForeignKey::new(from, ref_table)
                .references(to.unwrap_or_else(|| strata_schema::ID_COLUMN.to_string()))
                .on_delete(OnDelete::from_sql(&on_delete));
            table.foreign_keys.push(fk);
        }
        Ok(table)
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for SqliteBackend {
    fn vendor(&self) -> &str {
        "sqlite"
    }

    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> StrataResult<u64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            if params.is_empty() {
                // Batch execution also accepts statements that return rows,
                // such as `PRAGMA journal_mode`.
                conn.execute_batch(&sql).map_err(|e| sqlite_error(&e))?;
                return Ok(conn.changes());
            }
            let mut stmt = conn.prepare(&sql).map_err(|e| sqlite_error(&e))?;
            Self::bind_params(&mut stmt, &params)?;
            let count = stmt.raw_execute().map_err(|e| sqlite_error(&e))?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> StrataResult<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&sql).map_err(|e| sqlite_error(&e))?;
            let column_names: Vec<String> =
                stmt.column_names().into_iter().map(String::from).collect();
            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows.next().map_err(|e| sqlite_error(&e))? {
                rows.push(Self::convert_row(row, &column_names));
            }
            Ok(rows)
        })
        .await
        .map_err(|e| join_error(&e))?
    }

    fn is_missing_object_error(&self, err: &StrataError) -> bool {
        match err {
            StrataError::Database { message, .. }
            | StrataError::StatementExecution { message, .. } => {
                message.contains("no such index") || message.contains("no such table")
            }
            _ => false,
        }
    }

    async fn introspect(&self, exclude: &[&str]) -> StrataResult<Vec<Table>> {
        let rows = self
            .query(
                "SELECT name, sql FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;
        let mut tables = Vec::new();
        for row in &rows {
            let name: String = row.get("name")?;
            if name.starts_with(REBUILD_PREFIX) || exclude.contains(&name.as_str()) {
                continue;
            }
            let create_sql: Option<String> = row.get("sql")?;
            tables.push(
                self.introspect_table(&name, create_sql.as_deref().unwrap_or_default())
                    .await?,
            );
        }
        tracing::debug!(tables = tables.len(), "Introspected SQLite schema");
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::ColumnType;

    #[tokio::test]
    async fn test_sqlite_memory_open() {
        let backend = SqliteBackend::memory().unwrap();
        assert_eq!(backend.vendor(), "sqlite");
        assert_eq!(backend.engine(), Engine::Sqlite);
    }

    #[tokio::test]
    async fn test_sqlite_insert_and_query() {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)",
                &[],
            )
            .await
            .unwrap();
        backend
            .execute(
                "INSERT INTO users (name, age) VALUES (?, ?)",
                &[Value::from("Alice"), Value::from(30)],
            )
            .await
            .unwrap();

        let rows = backend
            .query("SELECT id, name, age FROM users", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<String>("name").unwrap(), "Alice");
        assert_eq!(rows[0].get::<i64>("age").unwrap(), 30);
    }

    #[tokio::test]
    async fn test_sqlite_query_one() {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute("CREATE TABLE test (id INTEGER PRIMARY KEY, val TEXT)", &[])
            .await
            .unwrap();
        backend
            .execute("INSERT INTO test (val) VALUES (?)", &[Value::from("a")])
            .await
            .unwrap();

        let row = backend
            .query_one("SELECT val FROM test WHERE id = ?", &[Value::from(1)])
            .await
            .unwrap();
        assert_eq!(row.get::<String>("val").unwrap(), "a");

        let missing = backend
            .query_one("SELECT val FROM test WHERE id = ?", &[Value::from(9)])
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_sqlite_transaction_rollback() {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        backend.begin().await.unwrap();
        backend.execute("INSERT INTO t DEFAULT VALUES", &[]).await.unwrap();
        backend.rollback().await.unwrap();
        let rows = backend.query("SELECT id FROM t", &[]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_missing_index_error_is_recognised() {
        let backend = SqliteBackend::memory().unwrap();
        let err = backend
            .execute("DROP INDEX \"nope\"", &[])
            .await
            .unwrap_err();
        assert!(backend.is_missing_object_error(&err));

        let err = backend.execute("SELEC 1", &[]).await.unwrap_err();
        assert!(!backend.is_missing_object_error(&err));
    }

    #[tokio::test]
    async fn test_introspect() {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute(
                "CREATE TABLE \"users\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
                 \"email\" VARCHAR NOT NULL, \"active\" BOOLEAN NOT NULL DEFAULT TRUE)",
                &[],
            )
            .await
            .unwrap();
        backend
            .execute(
                "CREATE UNIQUE INDEX \"users_email_unique\" ON \"users\" (\"email\")",
                &[],
            )
            .await
            .unwrap();
        backend
            .execute(
                "CREATE TABLE \"posts\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
                 \"user_id\" BIGINT NULL, \
                 CONSTRAINT \"posts_user_id_foreign\" FOREIGN KEY (\"user_id\") \
                 REFERENCES \"users\" (\"id\") ON DELETE CASCADE)",
                &[],
            )
            .await
            .unwrap();
        backend
            .execute("CREATE TABLE \"strata_migrations\" (\"id\" INTEGER)", &[])
            .await
            .unwrap();

        let tables = backend.introspect(&["strata_migrations"]).await.unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["posts", "users"]);

        let users = &tables[1];
        let id = users.column("id").unwrap();
        assert!(id.auto_increment);
        assert!(users.has_implicit_primary_key());
        assert_eq!(users.column("active").unwrap().column_type, ColumnType::Boolean);
        assert!(users.index("email", IndexKind::Unique).is_some());

        let posts = &tables[0];
        let fk = posts.foreign_key("user_id").unwrap();
        assert_eq!(fk.ref_table, "users");
        assert_eq!(fk.on_delete, OnDelete::Cascade);
        assert!(posts.column("user_id").unwrap().nullable);
    }
}
