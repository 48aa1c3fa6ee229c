//! Declared models and their conversion into desired tables.
//!
//! A [`ModelRegistry`] is the explicit list of model descriptors an
//! application supplies, either built in code or loaded from a JSON/TOML
//! models file. [`ModelRegistry::tables`] turns it into the desired
//! `Table` list that the comparer diffs against history.
//!
//! ## Models file
//!
//! ```toml
//! [[models]]
//! name = "User"
//! table = "users"
//!
//! [[models.fields]]
//! name = "email"
//! type = "varchar"
//! size = 255
//! index = "unique"
//!
//! [[models]]
//! name = "Post"
//!
//! [[models.fields]]
//! name = "author_id"
//! type = "bigint"
//! unsigned = true
//! relation = { model = "User", on_delete = "cascade" }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_core::{StrataError, StrataResult};

use crate::column::Column;
use crate::foreign_key::{ForeignKey, OnDelete};
use crate::index::{Index, IndexKind};
use crate::table::Table;
use crate::ID_COLUMN;

/// A relation from one model's field to another model's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// The referenced model's name.
    pub model: String,
    #[serde(default)]
    pub on_delete: OnDelete,
}

/// One declared field: a column template plus optional index and relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(flatten)]
    pub column: Column,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
}

impl FieldDescriptor {
    pub const fn new(column: Column) -> Self {
        Self {
            column,
            index: None,
            relation: None,
        }
    }

    #[must_use]
    pub const fn indexed(mut self, kind: IndexKind) -> Self {
        self.index = Some(kind);
        self
    }

    #[must_use]
    pub fn relates_to(mut self, model: impl Into<String>, on_delete: OnDelete) -> Self {
        self.relation = Some(Relation {
            model: model.into(),
            on_delete,
        });
        self
    }
}

/// A declared model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// The model name, e.g. `BlogPost`.
    pub name: String,
    /// Explicit table name. Defaults to the snake-cased model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// The table this model maps to.
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| to_snake_case(&self.name))
    }
}

/// Converts `BlogPost` to `blog_post`.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// The ordered list of declared models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model. Models keep their registration order.
    pub fn register(&mut self, model: ModelDescriptor) {
        self.models.push(model);
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn from_json_str(json: &str) -> StrataResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_toml_str(toml_str: &str) -> StrataResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| StrataError::SerializationError(format!("Invalid models TOML: {e}")))
    }

    /// Loads a models file; `.json` is read as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> StrataResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Builds the desired tables, in registration order.
    ///
    /// Each table gets the implicit `id` primary key unless the model
    /// declares its own. Relations become foreign keys to the referenced
    /// table's `id`. Fails with [`StrataError::ModelIntegrity`] before any
    /// table is returned if two models are structurally indistinguishable or
    /// a relation names an undeclared model.
    pub fn tables(&self) -> StrataResult<Vec<Table>> {
        let table_names: HashMap<&str, String> = self
            .models
            .iter()
            .map(|m| (m.name.as_str(), m.table_name()))
            .collect();

        let mut tables = Vec::with_capacity(self.models.len());
        for model in &self.models {
            let table = build_table(model, &table_names)?;
            table.validate()?;
            tables.push(table);
        }
        check_integrity(&tables)?;
        tracing::debug!(count = tables.len(), "Built desired tables from models");
        Ok(tables)
    }
}

fn build_table(model: &ModelDescriptor, table_names: &HashMap<&str, String>) -> StrataResult<Table> {
    let mut table = Table::new(model.table_name());
    let declares_id = model.fields.iter().any(|f| f.column.name == ID_COLUMN);
    let declares_pk = model
        .fields
        .iter()
        .any(|f| f.index == Some(IndexKind::PrimaryKey));

    if !declares_id && !declares_pk {
        table = table
            .with_column(Column::implicit_id())
            .with_index(Index::primary(ID_COLUMN));
    } else if declares_id && !declares_pk {
        table = table.with_index(Index::primary(ID_COLUMN));
    }

    for field in &model.fields {
        table = table.with_column(field.column.clone());
        if let Some(kind) = field.index {
            table = table.with_index(Index::new(&field.column.name, kind));
        }
        if let Some(relation) = &field.relation {
            let ref_table = table_names.get(relation.model.as_str()).ok_or_else(|| {
                StrataError::ModelIntegrity(format!(
                    "{}.{} relates to undeclared model '{}'",
                    model.name, field.column.name, relation.model
                ))
            })?;
            table = table.with_foreign_key(
                ForeignKey::new(&field.column.name, ref_table).on_delete(relation.on_delete),
            );
        }
    }
    Ok(table)
}

/// Rejects declared tables the structural rename detection could not tell apart.
fn check_integrity(tables: &[Table]) -> StrataResult<()> {
    for (i, a) in tables.iter().enumerate() {
        for b in &tables[i + 1..] {
            if a.name == b.name {
                return Err(StrataError::ModelIntegrity(format!(
                    "two models map to table '{}'",
                    a.name
                )));
            }
            if a.column_name_set() == b.column_name_set() {
                return Err(StrataError::ModelIntegrity(format!(
                    "tables '{}' and '{}' have identical column-name sets",
                    a.name, b.name
                )));
            }
            if a.type_signature() == b.type_signature() {
                return Err(StrataError::ModelIntegrity(format!(
                    "tables '{}' and '{}' have identical type signatures",
                    a.name, b.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelDescriptor::new("User")
                .table("users")
                .field(FieldDescriptor::new(Column::varchar("name", 100)))
                .field(FieldDescriptor::new(Column::varchar("email", 255)).indexed(IndexKind::Unique)),
        );
        registry.register(
            ModelDescriptor::new("BlogPost")
                .field(FieldDescriptor::new(Column::varchar("title", 200)))
                .field(
                    FieldDescriptor::new(Column::foreign_id("author_id"))
                        .relates_to("User", OnDelete::Cascade),
                ),
        );
        registry
    }

    #[test]
    fn test_snake_case_table_name() {
        assert_eq!(to_snake_case("BlogPost"), "blog_post");
        assert_eq!(to_snake_case("user"), "user");
    }

    #[test]
    fn test_tables_add_implicit_id() {
        let tables = registry().tables().unwrap();
        assert_eq!(tables.len(), 2);
        let users = &tables[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.fields[0], Column::implicit_id());
        assert!(users.has_implicit_primary_key());
        assert!(users.index("email", IndexKind::Unique).is_some());
    }

    #[test]
    fn test_relation_becomes_foreign_key() {
        let tables = registry().tables().unwrap();
        let posts = &tables[1];
        assert_eq!(posts.name, "blog_post");
        let fk = posts.foreign_key("author_id").unwrap();
        assert_eq!(fk.ref_table, "users");
        assert_eq!(fk.ref_field, "id");
        assert_eq!(fk.on_delete, OnDelete::Cascade);
    }

    #[test]
    fn test_declared_primary_key_suppresses_id() {
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelDescriptor::new("Country")
                .field(FieldDescriptor::new(Column::new("code", ColumnType::Char).size(2))
                    .indexed(IndexKind::PrimaryKey)),
        );
        let tables = registry.tables().unwrap();
        assert!(!tables[0].has_column("id"));
        assert_eq!(tables[0].primary_key().unwrap().field, "code");
    }

    #[test]
    fn test_unknown_relation_model() {
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelDescriptor::new("Post").field(
                FieldDescriptor::new(Column::foreign_id("user_id"))
                    .relates_to("User", OnDelete::Restrict),
            ),
        );
        assert!(matches!(
            registry.tables(),
            Err(StrataError::ModelIntegrity(_))
        ));
    }

    #[test]
    fn test_identical_column_sets_rejected() {
        let mut registry = registry();
        registry.register(
            ModelDescriptor::new("Member")
                .field(FieldDescriptor::new(Column::new("email", ColumnType::Text)))
                .field(FieldDescriptor::new(Column::new("name", ColumnType::Text))),
        );
        let err = registry.tables().unwrap_err();
        assert!(err.is_fatal_before_sql());
        assert!(err.to_string().contains("column-name sets"));
    }

    #[test]
    fn test_identical_type_signatures_rejected() {
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelDescriptor::new("Alpha").field(FieldDescriptor::new(Column::varchar("x", 10))),
        );
        registry.register(
            ModelDescriptor::new("Beta").field(FieldDescriptor::new(Column::varchar("y", 10))),
        );
        let err = registry.tables().unwrap_err();
        assert!(matches!(err, StrataError::ModelIntegrity(_)));
        assert!(err.to_string().contains("type signatures"));

        let mut registry = ModelRegistry::new();
        registry.register(
            ModelDescriptor::new("Alpha").field(FieldDescriptor::new(Column::varchar("x", 10))),
        );
        registry.register(
            ModelDescriptor::new("Beta").field(FieldDescriptor::new(Column::varchar("y", 20))),
        );
        assert_eq!(registry.tables().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_column_rejected() {
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelDescriptor::new("Post")
                .field(FieldDescriptor::new(Column::new("state", ColumnType::Enum))),
        );
        assert!(matches!(
            registry.tables(),
            Err(StrataError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_from_toml_str() {
        let toml = r#"
            [[models]]
            name = "User"
            table = "users"

            [[models.fields]]
            name = "email"
            type = "varchar"
            size = 255
            index = "unique"

            [[models]]
            name = "Post"

            [[models.fields]]
            name = "author_id"
            type = "bigint"
            unsigned = true
            relation = { model = "User", on_delete = "cascade" }

            [[models.fields]]
            name = "status"
            type = "enum"
            size = ["draft", "published"]
        "#;
        let registry = ModelRegistry::from_toml_str(toml).unwrap();
        let tables = registry.tables().unwrap();
        assert_eq!(tables[1].name, "post");
        assert_eq!(tables[1].foreign_key("author_id").unwrap().ref_table, "users");
        assert_eq!(
            tables[1].column("status").unwrap().enum_options(),
            ["draft", "published"]
        );
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{"models": [{"name": "Tag", "fields": [
            {"name": "label", "type": "varchar", "size": 50, "index": "index"}
        ]}]}"#;
        let tables = ModelRegistry::from_json_str(json).unwrap().tables().unwrap();
        assert_eq!(tables[0].name, "tag");
        assert!(tables[0].index("label", IndexKind::Index).is_some());
    }
}
