//! Repository construction settings.
//!
//! # Responsibility
//! - Describe one repository table as plain, deserializable data.
//!
//! # Invariants
//! - `columns` order is the table's column order.
//! - Omitted optional settings fall back to `Default` values.

use crate::db::StorageLocation;
use crate::repo::schema::ColumnSchema;
use crate::repo::MissingRowPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Everything needed to open a `SqliteRepository`.
///
/// Example (JSON):
///
/// ```json
/// {
///   "location": ":memory:",
///   "table": "books",
///   "columns": [
///     { "name": "title", "type": "TEXT" },
///     { "name": "pages", "type": "INTEGER" }
///   ],
///   "on_missing_row": "error"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// File path, or `:memory:` for a private in-memory database.
    pub location: StorageLocation,
    /// Target table name.
    pub table: String,
    /// Ordered column list; never includes the primary key.
    pub columns: ColumnSchema,
    /// Behavior of `update`/`delete` when no row matches.
    #[serde(default)]
    pub on_missing_row: MissingRowPolicy,
    /// SQLite busy handler timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl RepositoryConfig {
    pub fn new(
        location: impl Into<StorageLocation>,
        table: impl Into<String>,
        columns: ColumnSchema,
    ) -> Self {
        Self {
            location: location.into(),
            table: table.into(),
            columns,
            on_missing_row: MissingRowPolicy::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn with_missing_row_policy(mut self, policy: MissingRowPolicy) -> Self {
        self.on_missing_row = policy;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}
