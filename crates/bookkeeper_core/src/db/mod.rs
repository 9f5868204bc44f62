//! SQLite connection bootstrap.
//!
//! # Responsibility
//! - Resolve where a repository's backing table lives (file or memory).
//! - Open and configure SQLite connections before any table access.
//!
//! # Invariants
//! - Every connection handed to a repository has `foreign_keys=ON`.
//! - Open failures carry the storage location they were raised for.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

mod open;

pub use open::{enable_foreign_keys, open_db, open_db_in_memory, open_location};

/// Marker accepted in configuration for a private in-memory database.
pub const IN_MEMORY_MARKER: &str = ":memory:";

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The backing store could not be opened or configured.
    Open {
        location: StorageLocation,
        source: rusqlite::Error,
    },
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { location, source } => {
                write!(f, "storage unavailable at `{location}`: {source}")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Where a repository's table is stored.
///
/// Serialized as a plain string: `:memory:` selects a private in-memory
/// database, anything else is treated as a file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageLocation {
    Memory,
    File(PathBuf),
}

impl StorageLocation {
    /// Builds a file-backed location.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

impl Display for StorageLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str(IN_MEMORY_MARKER),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<&str> for StorageLocation {
    fn from(value: &str) -> Self {
        if value == IN_MEMORY_MARKER {
            Self::Memory
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

impl From<String> for StorageLocation {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<StorageLocation> for String {
    fn from(value: StorageLocation) -> Self {
        value.to_string()
    }
}

impl From<PathBuf> for StorageLocation {
    fn from(value: PathBuf) -> Self {
        Self::File(value)
    }
}

impl From<&Path> for StorageLocation {
    fn from(value: &Path) -> Self {
        Self::File(value.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::StorageLocation;
    use std::path::PathBuf;

    #[test]
    fn memory_marker_maps_to_memory_location() {
        assert_eq!(StorageLocation::from(":memory:"), StorageLocation::Memory);
        assert!(StorageLocation::from(":memory:").is_memory());
    }

    #[test]
    fn other_strings_map_to_file_locations() {
        assert_eq!(
            StorageLocation::from("data/books.db"),
            StorageLocation::File(PathBuf::from("data/books.db"))
        );
    }

    #[test]
    fn display_restores_configuration_string() {
        assert_eq!(StorageLocation::Memory.to_string(), ":memory:");
        assert_eq!(StorageLocation::file("books.db").to_string(), "books.db");
    }
}
