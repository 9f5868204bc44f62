//! SQLite-backed generic table repository.
//!
//! # Responsibility
//! - Own one connection and one table for records of type `T`.
//! - Translate CRUD calls into parameterized statements.
//! - Map rows to records positionally through the column schema.
//!
//! # Invariants
//! - The table exists before any operation is accepted.
//! - Construction never drops or alters an existing table.
//! - Values are always bound; only validated identifiers reach SQL text.
//! - No record is cached; every read builds fresh values.

use super::filter::Filter;
use super::schema::{validate_identifier, ColumnSchema, SchemaError};
use super::sql::TableStatements;
use super::{MissingRowPolicy, RepoError, RepoResult, Repository};
use crate::config::RepositoryConfig;
use crate::db::{enable_foreign_keys, open_location, StorageLocation};
use crate::model::entity::{Entity, EntityError, FieldMap, PrimaryKey};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::marker::PhantomData;

/// Repository storing `T` records as rows of one SQLite table.
///
/// The repository owns its connection; dropping it closes the connection.
/// It is `Send` but not `Sync`: share it across threads only behind a lock.
pub struct SqliteRepository<T> {
    conn: Connection,
    table: String,
    schema: ColumnSchema,
    statements: TableStatements,
    on_missing_row: MissingRowPolicy,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SqliteRepository<T> {
    /// Opens the configured store and ensures the table exists.
    ///
    /// # Errors
    /// - `RepoError::Db(DbError::Open { .. })` when the store is unavailable.
    /// - `RepoError::Schema` when the table name is invalid or an existing
    ///   table lacks a configured column.
    pub fn open(config: &RepositoryConfig) -> RepoResult<Self> {
        validate_identifier(&config.table)?;
        let conn = open_location(&config.location, config.busy_timeout())?;
        let repo = Self::from_connection(conn, config.table.as_str(), config.columns.clone())?;
        Ok(repo.with_missing_row_policy(config.on_missing_row))
    }

    /// Opens `location` with default settings and ensures `table` exists.
    pub fn new(
        location: impl Into<StorageLocation>,
        table: impl Into<String>,
        columns: ColumnSchema,
    ) -> RepoResult<Self> {
        Self::open(&RepositoryConfig::new(location, table, columns))
    }

    /// Takes ownership of an already open connection.
    ///
    /// Foreign-key enforcement is switched on for `conn` before the table
    /// is created.
    pub fn from_connection(
        conn: Connection,
        table: impl Into<String>,
        columns: ColumnSchema,
    ) -> RepoResult<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        enable_foreign_keys(&conn)?;

        let statements = TableStatements::new(&table, &columns);
        conn.execute_batch(&statements.create_table)?;
        ensure_columns_exist(&conn, &table, &columns)?;

        info!(
            "event=repo_init module=repo status=ok table={table} columns={}",
            columns.len()
        );

        Ok(Self {
            conn,
            table,
            schema: columns,
            statements,
            on_missing_row: MissingRowPolicy::default(),
            _entity: PhantomData,
        })
    }

    pub fn with_missing_row_policy(mut self, policy: MissingRowPolicy) -> Self {
        self.on_missing_row = policy;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn missing_row_policy(&self) -> MissingRowPolicy {
        self.on_missing_row
    }

    /// Borrows the owned connection, e.g. for inspection in tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection and reports a failed close.
    pub fn close(self) -> RepoResult<()> {
        let table = self.table;
        self.conn.close().map_err(|(_, err)| RepoError::from(err))?;
        info!("event=repo_close module=repo status=ok table={table}");
        Ok(())
    }

    fn add_row(&self, entity: &mut T) -> RepoResult<PrimaryKey> {
        let values = self.entity_values(entity)?;
        let mut stmt = self.conn.prepare_cached(&self.statements.insert)?;
        let inserted: Option<PrimaryKey> = stmt
            .query_row(params_from_iter(values.iter()), |row| row.get(0))
            .optional()?;

        let Some(pk) = inserted else {
            panic!(
                "insert into `{}` succeeded without a generated row id",
                self.table
            );
        };
        assert!(
            pk > 0,
            "insert into `{}` returned non-positive row id {pk}",
            self.table
        );

        entity.set_primary_key(pk);
        debug!(
            "event=repo_add module=repo status=ok table={} pk={pk}",
            self.table
        );
        Ok(pk)
    }

    fn get_row(&self, pk: PrimaryKey) -> RepoResult<Option<T>> {
        let mut stmt = self.conn.prepare_cached(&self.statements.select_by_pk)?;
        let mut rows = stmt.query([pk])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.decode_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_rows(&self, filter: Option<&Filter>) -> RepoResult<Vec<T>> {
        let (sql, values): (String, Vec<&Value>) = match filter {
            Some(filter) => {
                self.ensure_known_fields(filter)?;
                (
                    self.statements.select_where(filter.fields()),
                    filter.values().collect(),
                )
            }
            None => (self.statements.select_where(std::iter::empty()), Vec::new()),
        };

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(self.decode_row(row)?);
        }

        debug!(
            "event=repo_get_all module=repo status=ok table={} filtered={} rows={}",
            self.table,
            filter.is_some_and(|filter| !filter.is_empty()),
            entities.len()
        );
        Ok(entities)
    }

    fn update_row(&self, entity: &T) -> RepoResult<()> {
        let pk = entity.primary_key().ok_or(RepoError::MissingPrimaryKey)?;
        let mut values = self.entity_values(entity)?;
        values.push(Value::Integer(pk));

        let mut stmt = self.conn.prepare_cached(&self.statements.update_by_pk)?;
        let changed = stmt.execute(params_from_iter(values.iter()))?;
        self.check_changed("repo_update", pk, changed)
    }

    fn delete_row(&self, pk: PrimaryKey) -> RepoResult<()> {
        let mut stmt = self.conn.prepare_cached(&self.statements.delete_by_pk)?;
        let changed = stmt.execute([pk])?;
        self.check_changed("repo_delete", pk, changed)
    }

    /// Reads schema columns from `entity` in schema order.
    fn entity_values(&self, entity: &T) -> RepoResult<Vec<Value>> {
        self.schema
            .names()
            .map(|column| {
                entity
                    .field_value(column)
                    .ok_or_else(|| RepoError::from(EntityError::MissingField(column.to_string())))
            })
            .collect()
    }

    /// Zips schema column names with row values (after the leading rowid).
    fn decode_row(&self, row: &Row<'_>) -> RepoResult<T> {
        let pk: PrimaryKey = row.get(0)?;
        let fields = self
            .schema
            .names()
            .enumerate()
            .map(|(index, name)| row.get::<_, Value>(index + 1).map(|value| (name, value)))
            .collect::<rusqlite::Result<FieldMap>>()?;

        let mut entity = T::from_fields(&fields)?;
        entity.set_primary_key(pk);
        Ok(entity)
    }

    fn ensure_known_fields(&self, filter: &Filter) -> RepoResult<()> {
        match filter.fields().find(|field| !self.schema.contains(field)) {
            Some(field) => Err(RepoError::UnknownColumn {
                table: self.table.clone(),
                column: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn check_changed(&self, event: &str, pk: PrimaryKey, changed: usize) -> RepoResult<()> {
        if changed == 0 && self.on_missing_row == MissingRowPolicy::Error {
            return Err(RepoError::NotFound(pk));
        }
        debug!(
            "event={event} module=repo status=ok table={} pk={pk} changed={changed}",
            self.table
        );
        Ok(())
    }

    fn logged<V>(&self, event: &str, result: RepoResult<V>) -> RepoResult<V> {
        if let Err(err) = &result {
            warn!(
                "event={event} module=repo status=error table={} error={err}",
                self.table
            );
        }
        result
    }
}

impl<T: Entity> Repository<T> for SqliteRepository<T> {
    fn add(&self, entity: &mut T) -> RepoResult<PrimaryKey> {
        self.logged("repo_add", self.add_row(entity))
    }

    fn get(&self, pk: PrimaryKey) -> RepoResult<Option<T>> {
        self.logged("repo_get", self.get_row(pk))
    }

    fn get_all(&self, filter: Option<&Filter>) -> RepoResult<Vec<T>> {
        self.logged("repo_get_all", self.get_rows(filter))
    }

    fn update(&self, entity: &T) -> RepoResult<()> {
        self.logged("repo_update", self.update_row(entity))
    }

    fn delete(&self, pk: PrimaryKey) -> RepoResult<()> {
        self.logged("repo_delete", self.delete_row(pk))
    }
}

/// Verifies that an existing table carries every schema column.
fn ensure_columns_exist(conn: &Connection, table: &str, schema: &ColumnSchema) -> RepoResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let existing = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for column in schema.names() {
        if !existing
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column))
        {
            return Err(SchemaError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            }
            .into());
        }
    }

    Ok(())
}
