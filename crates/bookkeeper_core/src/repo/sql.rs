//! Statement text for one repository table.
//!
//! # Responsibility
//! - Render every CRUD statement from a validated table name and schema.
//! - Keep values out of SQL text; only identifiers are interpolated.
//!
//! # Invariants
//! - Placeholders are numbered in schema column order starting at `?1`.
//! - Row identity is addressed through SQLite `rowid`; inserts return it.

use super::schema::{quote_identifier, ColumnSchema};

/// Pre-rendered statements for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableStatements {
    pub create_table: String,
    pub insert: String,
    pub select_by_pk: String,
    pub select_all: String,
    pub update_by_pk: String,
    pub delete_by_pk: String,
}

impl TableStatements {
    /// Renders all fixed statements for `table`.
    ///
    /// `table` and every column name must already be validated identifiers.
    pub fn new(table: &str, schema: &ColumnSchema) -> Self {
        let table = quote_identifier(table);
        let columns: Vec<String> = schema.names().map(quote_identifier).collect();
        let column_list = columns.join(", ");
        let select_all = format!("SELECT rowid, {column_list} FROM {table}");

        let definitions = schema
            .columns()
            .iter()
            .map(|column| format!("{} {}", quote_identifier(&column.name), column.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            create_table: format!("CREATE TABLE IF NOT EXISTS {table} ({definitions});"),
            insert: format!(
                "INSERT INTO {table} ({column_list}) VALUES ({placeholders}) RETURNING rowid;"
            ),
            select_by_pk: format!("{select_all} WHERE rowid = ?1;"),
            update_by_pk: format!(
                "UPDATE {table} SET {assignments} WHERE rowid = ?{};",
                columns.len() + 1
            ),
            delete_by_pk: format!("DELETE FROM {table} WHERE rowid = ?1;"),
            select_all,
        }
    }

    /// Renders a scan restricted by equality on `fields`, ANDed together.
    ///
    /// With no fields this is the unfiltered scan.
    pub fn select_where<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> String {
        let conditions = fields
            .into_iter()
            .enumerate()
            .map(|(index, field)| format!("{} = ?{}", quote_identifier(field), index + 1))
            .collect::<Vec<_>>();

        if conditions.is_empty() {
            format!("{};", self.select_all)
        } else {
            format!("{} WHERE {};", self.select_all, conditions.join(" AND "))
        }
    }
}
