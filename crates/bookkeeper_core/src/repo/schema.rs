//! Column schema for repository tables.
//!
//! # Responsibility
//! - Hold the ordered column name to column type mapping of one table.
//! - Validate table and column identifiers before they reach SQL text.
//!
//! # Invariants
//! - Column order is fixed at construction; it drives positional binding
//!   and positional decoding.
//! - The row identity (`rowid` and its aliases) is never a schema column.
//! - Identifiers match `[A-Za-z_][A-Za-z0-9_]*`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

const RESERVED_COLUMNS: &[&str] = &["rowid", "oid", "_rowid_"];

/// Error raised for an unusable table shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    EmptySchema,
    InvalidIdentifier(String),
    ReservedColumn(String),
    DuplicateColumn(String),
    InvalidColumnType { column: String, declared: String },
    /// An existing table lacks a column the schema requires.
    MissingColumn { table: String, column: String },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySchema => write!(f, "column schema must declare at least one column"),
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::ReservedColumn(name) => {
                write!(f, "column name `{name}` is reserved for the row identity")
            }
            Self::DuplicateColumn(name) => write!(f, "column `{name}` is declared twice"),
            Self::InvalidColumnType { column, declared } => {
                write!(f, "invalid type `{declared}` for column `{column}`")
            }
            Self::MissingColumn { table, column } => {
                write!(f, "existing table `{table}` has no column `{column}`")
            }
        }
    }
}

impl Error for SchemaError {}

/// Checks that `name` can be interpolated as a table or column name.
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// Quotes an already validated identifier for SQL text.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// Storage type declared for one column.
///
/// `Declared` keeps any other declaration verbatim, including column
/// constraints such as `TEXT UNIQUE` or `INTEGER REFERENCES parent(code)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    Numeric,
    Declared(String),
}

impl ColumnType {
    /// Returns the declaration used in `CREATE TABLE`.
    pub fn as_sql(&self) -> &str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
            Self::Declared(declared) => declared.as_str(),
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("column type cannot be empty".to_string());
        }
        if trimmed.contains(';') {
            return Err(format!("column type `{trimmed}` cannot contain `;`"));
        }
        Ok(match trimmed.to_ascii_uppercase().as_str() {
            "TEXT" => Self::Text,
            "INTEGER" => Self::Integer,
            "REAL" => Self::Real,
            "BLOB" => Self::Blob,
            "NUMERIC" => Self::Numeric,
            _ => Self::Declared(trimmed.to_string()),
        })
    }
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_sql().to_string()
    }
}

/// One named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered, validated column list of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnDef>", into = "Vec<ColumnDef>")]
pub struct ColumnSchema {
    columns: Vec<ColumnDef>,
}

impl ColumnSchema {
    /// Validates and freezes a column list.
    ///
    /// # Errors
    /// - `EmptySchema` when no column is given.
    /// - `InvalidIdentifier`, `ReservedColumn`, `DuplicateColumn` for bad names.
    /// - `InvalidColumnType` when a `Declared` type is empty or holds `;`.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        for (index, column) in columns.iter().enumerate() {
            validate_identifier(&column.name)?;
            if RESERVED_COLUMNS
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(&column.name))
            {
                return Err(SchemaError::ReservedColumn(column.name.clone()));
            }
            // SQLite identifiers are case-insensitive.
            if columns[..index]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
            if let ColumnType::Declared(declared) = &column.ty {
                if declared.trim().is_empty() || declared.contains(';') {
                    return Err(SchemaError::InvalidColumnType {
                        column: column.name.clone(),
                        declared: declared.clone(),
                    });
                }
            }
        }

        Ok(Self { columns })
    }

    /// Builds a schema from `(name, type)` pairs, parsing each type.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, SchemaError> {
        let columns = pairs
            .into_iter()
            .map(|(name, declared)| {
                declared
                    .parse::<ColumnType>()
                    .map(|ty| ColumnDef::new(name, ty))
                    .map_err(|_| SchemaError::InvalidColumnType {
                        column: name.to_string(),
                        declared: declared.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    /// Column names follow SQLite and match ASCII case-insensitively.
    pub fn contains(&self, name: &str) -> bool {
        self.columns
            .iter()
            .any(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<Vec<ColumnDef>> for ColumnSchema {
    type Error = SchemaError;

    fn try_from(value: Vec<ColumnDef>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ColumnSchema> for Vec<ColumnDef> {
    fn from(value: ColumnSchema) -> Self {
        value.columns
    }
}
