//! Discovering migration artifacts on disk.
//!
//! The [`MigrationLoader`] reads every `*.json` file in the migrations
//! directory:
//!
//! ```text
//! migrations/
//!   0001.json
//!   0002.json
//! ```

use std::path::{Path, PathBuf};

use strata_core::{StrataError, StrataResult};

use crate::artifact::Migration;

/// Loads migration artifacts from a directory.
#[derive(Debug, Clone)]
pub struct MigrationLoader {
    migrations_dir: PathBuf,
}

impl MigrationLoader {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Loads every artifact, ordered by id ascending.
    ///
    /// A missing directory yields no migrations. Two files with the same id
    /// are an error.
    pub fn load(&self) -> StrataResult<Vec<Migration>> {
        let dir = &self.migrations_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut migrations = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let migration = Migration::from_json(&content).map_err(|e| {
                StrataError::SerializationError(format!(
                    "invalid migration file {}: {e}",
                    path.display()
                ))
            })?;
            migrations.push(migration);
        }

        migrations.sort_by_key(|m| m.id);
        if let Some(pair) = migrations.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(StrataError::ConfigurationError(format!(
                "migrations '{}' and '{}' share id {}",
                pair[0].name, pair[1].name, pair[0].id
            )));
        }
        tracing::debug!(count = migrations.len(), dir = %dir.display(), "Loaded migrations");
        Ok(migrations)
    }

    /// Loads a single artifact by name.
    pub fn get(&self, name: &str) -> StrataResult<Migration> {
        let path = self.migrations_dir.join(format!("{name}.json"));
        if !path.exists() {
            return Err(StrataError::MigrationNotFound(name.to_string()));
        }
        Migration::from_json(&std::fs::read_to_string(path)?)
    }

    /// The id the next generated migration gets: `max(existing) + 1`.
    pub fn next_id(&self) -> StrataResult<u32> {
        Ok(self.load()?.last().map_or(1, |m| m.id + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::{Operation, Table};

    fn migration(id: u32) -> Migration {
        Migration::new(
            id,
            vec![Operation::CreateTable {
                table: Table::with_id(format!("t{id}")),
            }],
            vec![Operation::DropTable {
                table: format!("t{id}"),
            }],
        )
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = MigrationLoader::new(dir.path().join("nope"));
        assert!(loader.load().unwrap().is_empty());
        assert_eq!(loader.next_id().unwrap(), 1);
    }

    #[test]
    fn test_load_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        for id in [2, 10, 1] {
            migration(id).write_to(dir.path()).unwrap();
        }
        std::fs::write(dir.path().join("README.txt"), "not a migration").unwrap();

        let loader = MigrationLoader::new(dir.path());
        let ids: Vec<u32> = loader.load().unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 10]);
        assert_eq!(loader.next_id().unwrap(), 11);
    }

    #[test]
    fn test_get_by_name() {
        let dir = tempfile::tempdir().unwrap();
        migration(4).write_to(dir.path()).unwrap();
        let loader = MigrationLoader::new(dir.path());
        assert_eq!(loader.get("0004").unwrap().id, 4);
        assert!(matches!(
            loader.get("0005"),
            Err(StrataError::MigrationNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let m = migration(1);
        m.write_to(dir.path()).unwrap();
        std::fs::write(dir.path().join("copy.json"), m.to_json().unwrap()).unwrap();
        assert!(MigrationLoader::new(dir.path()).load().is_err());
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001.json"), "{").unwrap();
        assert!(matches!(
            MigrationLoader::new(dir.path()).load(),
            Err(StrataError::SerializationError(_))
        ));
    }
}
