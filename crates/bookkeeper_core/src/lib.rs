//! Generic SQLite table repository for bookkeeper.
//! Maps caller-defined records to rows of a configured table and back.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::RepositoryConfig;
pub use db::{DbError, StorageLocation};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{Entity, EntityError, FieldMap, PrimaryKey};
pub use repo::filter::Filter;
pub use repo::schema::{ColumnDef, ColumnSchema, ColumnType, SchemaError};
pub use repo::sqlite_repo::SqliteRepository;
pub use repo::{MissingRowPolicy, RepoError, RepoResult, Repository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
