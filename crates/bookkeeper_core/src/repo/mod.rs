//! Repository contract and its SQLite implementation.
//!
//! # Responsibility
//! - Define the CRUD contract consumed by higher-level services.
//! - Isolate statement construction and row mapping from callers.
//!
//! # Invariants
//! - Every write commits before the call returns.
//! - `get` reports a missing row as `Ok(None)`, never as an error.
//! - Engine errors (constraint violations included) are surfaced unchanged
//!   inside `RepoError::Db`.

use crate::db::DbError;
use crate::model::entity::{Entity, EntityError, PrimaryKey};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod filter;
pub mod schema;
mod sql;
pub mod sqlite_repo;

use filter::Filter;
use schema::SchemaError;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by repository operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Schema(SchemaError),
    Entity(EntityError),
    /// A filter named a field that is not a schema column.
    UnknownColumn { table: String, column: String },
    /// `update` was called with an entity that was never added.
    MissingPrimaryKey,
    /// No row matched; raised only under `MissingRowPolicy::Error`.
    NotFound(PrimaryKey),
}

impl RepoError {
    /// Returns whether the engine rejected a write for a constraint
    /// (foreign key, unique, not null, check).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Entity(err) => write!(f, "{err}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::MissingPrimaryKey => write!(f, "entity has no primary key; add it first"),
            Self::NotFound(pk) => write!(f, "row not found: {pk}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Entity(err) => Some(err),
            Self::UnknownColumn { .. } | Self::MissingPrimaryKey | Self::NotFound(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SchemaError> for RepoError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<EntityError> for RepoError {
    fn from(value: EntityError) -> Self {
        Self::Entity(value)
    }
}

/// What `update`/`delete` do when no row has the requested key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRowPolicy {
    /// Matching zero rows is a silent no-op.
    #[default]
    Ignore,
    /// Matching zero rows returns `RepoError::NotFound`.
    Error,
}

/// CRUD contract over one table of `T` records.
pub trait Repository<T: Entity> {
    /// Persists `entity`, writes the generated key into it and returns the key.
    fn add(&self, entity: &mut T) -> RepoResult<PrimaryKey>;

    /// Loads the record stored under `pk`.
    fn get(&self, pk: PrimaryKey) -> RepoResult<Option<T>>;

    /// Loads every record, or only those matching all `filter` conditions.
    fn get_all(&self, filter: Option<&Filter>) -> RepoResult<Vec<T>>;

    /// Overwrites every column of the row keyed by `entity`.
    fn update(&self, entity: &T) -> RepoResult<()>;

    /// Removes the row stored under `pk`.
    fn delete(&self, pk: PrimaryKey) -> RepoResult<()>;

    /// Persists `entity` and returns it with its generated key attached.
    fn insert(&self, mut entity: T) -> RepoResult<T> {
        self.add(&mut entity)?;
        Ok(entity)
    }
}
