//! Entity contract for table-backed records.
//!
//! # Responsibility
//! - Define how a record type exposes its fields by column name.
//! - Define how a record type is rebuilt from decoded column values.
//!
//! # Invariants
//! - The primary key is never a column; it is the SQLite row identity.
//! - `from_fields` receives exactly the schema columns, keyed by name.

use rusqlite::types::{FromSql, Value, ValueRef};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned row identity exposed as the entity key.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type PrimaryKey = i64;

/// Record type that can be persisted as one row of a repository table.
///
/// Implementations map field names to column names one-to-one. Field order
/// is owned by the repository's column schema, not by the implementation.
pub trait Entity: Sized {
    /// Returns the assigned key, or `None` before the entity was added.
    fn primary_key(&self) -> Option<PrimaryKey>;

    /// Stores a storage-assigned key on this entity.
    fn set_primary_key(&mut self, pk: PrimaryKey);

    /// Returns the current value of the field stored in `column`.
    ///
    /// Returns `None` when this type has no field with that name.
    fn field_value(&self, column: &str) -> Option<Value>;

    /// Builds a fresh entity from decoded column values.
    ///
    /// The key is attached afterwards through `set_primary_key`.
    fn from_fields(fields: &FieldMap) -> Result<Self, EntityError>;
}

/// Error raised while moving values between an entity and a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// The entity has no field for a schema column.
    MissingField(String),
    /// A stored value could not be converted into the field's type.
    Decode { field: String, message: String },
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "entity has no field `{field}`"),
            Self::Decode { field, message } => {
                write!(f, "cannot decode field `{field}`: {message}")
            }
        }
    }
}

impl Error for EntityError {}

/// Column name to value mapping, kept in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: Vec<(String, Value)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing an earlier value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Returns the raw stored value for `name`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Converts the value stored for `name` into `T`.
    ///
    /// Use `Option<T>` for nullable columns.
    ///
    /// # Errors
    /// - `EntityError::MissingField` when `name` is absent.
    /// - `EntityError::Decode` when the stored value does not fit `T`.
    pub fn get<T: FromSql>(&self, name: &str) -> Result<T, EntityError> {
        let value = self
            .value(name)
            .ok_or_else(|| EntityError::MissingField(name.to_string()))?;
        T::column_result(ValueRef::from(value)).map_err(|err| EntityError::Decode {
            field: name.to_string(),
            message: err.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}
