//! Migration artifacts.
//!
//! A [`Migration`] is a numbered unit holding the forward operation list and
//! its exact inverse. It is persisted as `<dir>/<name>.json`.
//!
//! The first migration generated against a database that already had tables
//! also carries a `baseline`: the live schema it was diffed against. History
//! replay starts from that baseline.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strata_core::{StrataError, StrataResult};
use strata_schema::{Operation, Table};

/// Which way a migration is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A migration artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    /// Sequence number; the next migration gets `max + 1`.
    pub id: u32,
    /// Zero-padded sequence name, e.g. `0003`.
    pub name: String,
    pub created_at: NaiveDateTime,
    /// The "up" script.
    pub forward: Vec<Operation>,
    /// The inverse of `forward`, in the order it must be applied.
    pub reverse: Vec<Operation>,
    /// The introspected schema `forward` was computed against, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub baseline: Vec<Table>,
}

impl Migration {
    /// Creates a migration numbered `id`.
    pub fn new(id: u32, forward: Vec<Operation>, reverse: Vec<Operation>) -> Self {
        Self {
            id,
            name: Self::name_for(id),
            created_at: chrono::Local::now().naive_local(),
            forward,
            reverse,
            baseline: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_baseline(mut self, baseline: Vec<Table>) -> Self {
        self.baseline = baseline;
        self
    }

    /// The zero-padded name for a sequence number.
    pub fn name_for(id: u32) -> String {
        format!("{id:04}")
    }

    pub fn operations(&self, direction: Direction) -> &[Operation] {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Reverse => &self.reverse,
        }
    }

    /// The path of this migration's file inside `dir`.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.name))
    }

    pub fn to_json(&self) -> StrataResult<String> {
        serde_json::to_string_pretty(self).map_err(StrataError::from)
    }

    pub fn from_json(json: &str) -> StrataResult<Self> {
        serde_json::from_str(json).map_err(StrataError::from)
    }

    /// Writes the artifact into `dir`, creating the directory if needed.
    pub fn write_to(&self, dir: &Path) -> StrataResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = self.path_in(dir);
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::Column;

    fn sample() -> Migration {
        Migration::new(
            3,
            vec![Operation::AddColumn {
                table: "users".into(),
                column: Column::varchar("bio", 500).nullable(),
            }],
            vec![Operation::DropColumn {
                table: "users".into(),
                column: "bio".into(),
            }],
        )
    }

    #[test]
    fn test_name_is_zero_padded() {
        assert_eq!(sample().name, "0003");
        assert_eq!(Migration::name_for(12), "0012");
    }

    #[test]
    fn test_operations_by_direction() {
        let m = sample();
        assert_eq!(m.operations(Direction::Forward)[0].kind(), "add_column");
        assert_eq!(m.operations(Direction::Reverse)[0].kind(), "drop_column");
    }

    #[test]
    fn test_json_document_shape() {
        let m = Migration::new(1, vec![Operation::CreateTable { table: Table::with_id("tags") }], vec![]);
        let json: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        assert_eq!(json["name"], "0001");
        assert_eq!(json["forward"][0]["op"], "create_table");
        assert!(json["reverse"].as_array().unwrap().is_empty());
        assert!(json.get("baseline").is_none());
        assert_eq!(Migration::from_json(&m.to_json().unwrap()).unwrap(), m);
    }

    #[test]
    fn test_write_to_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("migrations");
        let path = sample().write_to(&target).unwrap();
        assert!(path.ends_with("0003.json"));
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Migration::from_json("{ nope"),
            Err(StrataError::SerializationError(_))
        ));
    }
}
