//! Column definitions.
//!
//! A [`Column`] is a plain value struct. Two columns are equal iff every field
//! matches, which is exactly the comparison the diff engine uses to decide
//! whether a column needs a `ModifyColumn`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strata_core::{StrataError, StrataResult};

use crate::value::Value;
use crate::ID_COLUMN;

/// The semantic, dialect-neutral type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Float,
    Double,
    Boolean,
    Char,
    Varchar,
    Text,
    LongText,
    Date,
    DateTime,
    Timestamp,
    Time,
    Json,
    Blob,
    Uuid,
    Enum,
}

impl ColumnType {
    /// Returns the lowercase semantic name of this type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::LongText => "longtext",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Time => "time",
            Self::Json => "json",
            Self::Blob => "blob",
            Self::Uuid => "uuid",
            Self::Enum => "enum",
        }
    }

    /// Returns `true` for integer types that may carry `auto_increment`.
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::TinyInt | Self::SmallInt | Self::Int | Self::BigInt)
    }

    /// Returns `true` for types that accept the `unsigned` modifier.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::TinyInt
                | Self::SmallInt
                | Self::Int
                | Self::BigInt
                | Self::Decimal
                | Self::Float
                | Self::Double
        )
    }

    /// Maps a bare SQL type keyword (as reported by a database) to a semantic type.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        let ty = match name.trim().to_lowercase().as_str() {
            "tinyint" => Self::TinyInt,
            "smallint" | "mediumint" => Self::SmallInt,
            "int" | "integer" => Self::Int,
            "bigint" => Self::BigInt,
            "decimal" | "numeric" => Self::Decimal,
            "float" | "real" => Self::Float,
            "double" | "double precision" => Self::Double,
            "boolean" | "bool" => Self::Boolean,
            "char" | "character" => Self::Char,
            "varchar" | "character varying" => Self::Varchar,
            "text" | "mediumtext" | "tinytext" | "clob" => Self::Text,
            "longtext" => Self::LongText,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "time" => Self::Time,
            "json" => Self::Json,
            "blob" | "longblob" | "mediumblob" | "binary" | "varbinary" => Self::Blob,
            "uuid" => Self::Uuid,
            "enum" => Self::Enum,
            _ => return None,
        };
        Some(ty)
    }

    /// Parses a full declared type such as `varchar(255)`, `decimal(8,2)`,
    /// `bigint unsigned`, or `enum('a','b')`.
    ///
    /// `tinyint(1)` is read back as [`ColumnType::Boolean`].
    pub fn parse_declared(declared: &str) -> Option<(Self, Option<ColumnSize>, bool)> {
        let declared = declared.trim();
        let lower = declared.to_lowercase();
        let unsigned = lower.contains(" unsigned");
        let (base, args) = match lower.find('(') {
            Some(open) => {
                let close = declared.rfind(')')?;
                (&lower[..open], Some(&declared[open + 1..close]))
            }
            None => (lower.split_whitespace().next().unwrap_or(""), None),
        };
        let ty = Self::from_sql_name(base)?;
        let size = match (ty, args) {
            (_, None) => None,
            (Self::TinyInt, Some("1")) => return Some((Self::Boolean, None, false)),
            (Self::Enum, Some(list)) => Some(ColumnSize::Options(parse_enum_options(list))),
            (_, Some(list)) => {
                let parts: Vec<u32> = list
                    .split(',')
                    .filter_map(|p| p.trim().parse().ok())
                    .collect();
                match parts.as_slice() {
                    [len] => Some(ColumnSize::Length(*len)),
                    [precision, scale] => Some(ColumnSize::Precision(*precision, *scale)),
                    _ => None,
                }
            }
        };
        Some((ty, size, unsigned))
    }
}

fn parse_enum_options(list: &str) -> Vec<String> {
    let mut options = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = list.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quote && chars.peek() == Some(&'\'') => {
                current.push('\'');
                chars.next();
            }
            '\'' if in_quote => {
                options.push(std::mem::take(&mut current));
                in_quote = false;
            }
            '\'' => in_quote = true,
            _ if in_quote => current.push(c),
            _ => {}
        }
    }
    options
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The size of a column: a length, a decimal precision, or enum options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSize {
    /// Character length or display width.
    Length(u32),
    /// Decimal `(precision, scale)`.
    Precision(u32, u32),
    /// Ordered options of an `enum` column.
    Options(Vec<String>),
}

/// A column default.
///
/// Generators are resolved at insert time by the [`Generators`] registry and
/// never render a SQL `DEFAULT` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    /// A literal value rendered inline.
    Literal(Value),
    /// A named generator computed per insert.
    Generator(String),
    /// `CURRENT_TIMESTAMP`.
    CurrentTimestamp,
}

/// A column definition.
///
/// # Examples
///
/// ```
/// use strata_schema::column::{Column, ColumnType};
///
/// let bio = Column::varchar("bio", 500).nullable();
/// assert_eq!(bio.column_type, ColumnType::Varchar);
/// assert!(bio.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// The column name.
    pub name: String,
    /// The semantic type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Length, precision, or enum options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ColumnSize>,
    /// Whether a numeric column is unsigned.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsigned: bool,
    /// Whether the column accepts NULL.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// The default, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ColumnDefault>,
    /// Whether the column auto-increments.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

impl Column {
    /// Creates a NOT NULL column with no size and no default.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            size: None,
            unsigned: false,
            nullable: false,
            default: None,
            auto_increment: false,
        }
    }

    /// The implicit `id` column: `bigint unsigned` auto-increment.
    pub fn implicit_id() -> Self {
        Self::new(ID_COLUMN, ColumnType::BigInt)
            .unsigned()
            .auto_increment()
    }

    /// Shorthand for a `varchar(len)` column.
    pub fn varchar(name: impl Into<String>, len: u32) -> Self {
        Self::new(name, ColumnType::Varchar).size(len)
    }

    /// Shorthand for a `bigint unsigned` column, the usual foreign key shape.
    pub fn foreign_id(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::BigInt).unsigned()
    }

    /// Shorthand for an `enum` column.
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        options: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(name, ColumnType::Enum).options(options)
    }

    // ── Builder methods ──────────────────────────────────────────────

    #[must_use]
    pub fn size(mut self, len: u32) -> Self {
        self.size = Some(ColumnSize::Length(len));
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.size = Some(ColumnSize::Precision(precision, scale));
        self
    }

    #[must_use]
    pub fn options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.size = Some(ColumnSize::Options(
            options.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub const fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(ColumnDefault::Literal(value.into()));
        self
    }

    #[must_use]
    pub fn generator(mut self, name: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Generator(name.into()));
        self
    }

    #[must_use]
    pub fn default_current_timestamp(mut self) -> Self {
        self.default = Some(ColumnDefault::CurrentTimestamp);
        self
    }

    /// Returns a copy of this column under a different name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Returns the length if the size is a plain length.
    pub const fn length(&self) -> Option<u32> {
        match self.size {
            Some(ColumnSize::Length(len)) => Some(len),
            _ => None,
        }
    }

    /// Returns the enum options, or an empty slice.
    pub fn enum_options(&self) -> &[String] {
        match &self.size {
            Some(ColumnSize::Options(options)) => options,
            _ => &[],
        }
    }

    /// Returns the SQL `DEFAULT` expression, if this column renders one.
    pub fn default_sql(&self) -> Option<String> {
        match &self.default {
            Some(ColumnDefault::Literal(value)) => Some(value.to_sql_literal()),
            Some(ColumnDefault::CurrentTimestamp) => Some("CURRENT_TIMESTAMP".to_string()),
            Some(ColumnDefault::Generator(_)) | None => None,
        }
    }

    /// Computes the value to insert when no value is supplied for this column.
    pub fn resolve_default(&self, generators: &Generators) -> StrataResult<Option<Value>> {
        match &self.default {
            Some(ColumnDefault::Literal(value)) => Ok(Some(value.clone())),
            Some(ColumnDefault::Generator(name)) => generators.generate(name).map(Some),
            Some(ColumnDefault::CurrentTimestamp) | None => Ok(None),
        }
    }

    /// Checks the column's structural invariants.
    pub fn validate(&self) -> StrataResult<()> {
        if self.name.trim().is_empty() {
            return Err(StrataError::InvalidSchema("column name is empty".into()));
        }
        match (&self.column_type, &self.size) {
            (ColumnType::Enum, Some(ColumnSize::Options(options))) if !options.is_empty() => {}
            (ColumnType::Enum, _) => {
                return Err(StrataError::InvalidSchema(format!(
                    "enum column '{}' requires a non-empty list of options",
                    self.name
                )));
            }
            (_, Some(ColumnSize::Options(_))) => {
                return Err(StrataError::InvalidSchema(format!(
                    "column '{}' of type {} cannot carry enum options",
                    self.name, self.column_type
                )));
            }
            _ => {}
        }
        if self.auto_increment && !self.column_type.is_integer() {
            return Err(StrataError::InvalidSchema(format!(
                "auto-increment column '{}' must be an integer type",
                self.name
            )));
        }
        if self.unsigned && !self.column_type.is_numeric() {
            return Err(StrataError::InvalidSchema(format!(
                "column '{}' of type {} cannot be unsigned",
                self.name, self.column_type
            )));
        }
        Ok(())
    }
}

// ============================================================
// Generators
// ============================================================

/// A function producing a default value at insert time.
pub type GeneratorFn = fn() -> Value;

/// Registry of named default generators.
///
/// [`ColumnDefault::Generator`] stores only the generator's name so that
/// columns stay plain, serializable values.
#[derive(Debug, Clone, Default)]
pub struct Generators {
    generators: HashMap<String, GeneratorFn>,
}

fn now() -> Value {
    Value::DateTime(chrono::Utc::now().naive_utc())
}

impl Generators {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `now` generator.
    pub fn with_builtins() -> Self {
        let mut generators = Self::new();
        generators.register("now", now);
        generators
    }

    /// Registers (or replaces) a generator.
    pub fn register(&mut self, name: impl Into<String>, generator: GeneratorFn) {
        self.generators.insert(name.into(), generator);
    }

    /// Returns `true` if a generator with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Runs the named generator.
    pub fn generate(&self, name: &str) -> StrataResult<Value> {
        self.generators.get(name).map(|f| f()).ok_or_else(|| {
            StrataError::ConfigurationError(format!("No default generator named '{name}'"))
        })
    }
}
