//! Entity table creation and verification.
//!
//! # Responsibility
//! - Translate a registered schema into one SQLite table.
//! - Verify that a pre-existing table can serve the schema unchanged.
//!
//! # Invariants
//! - `_seq` is `INTEGER PRIMARY KEY AUTOINCREMENT`, so values are never reused
//!   and follow insertion order.
//! - Identifiers are validated at schema registration and always quoted here.
//! - A column the schema marks unique must carry a UNIQUE constraint in an
//!   existing table.

use super::{DbError, DbResult};
use crate::schema::FieldKind;
use log::info;
use rusqlite::Connection;

/// Hidden column holding insertion order and row identity.
pub const SEQ_COLUMN: &str = "_seq";

/// Table layout derived from an entity schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub unique: bool,
}

/// Creates the table for `spec` or verifies the existing one.
///
/// Returns `true` when the table was created by this call.
pub fn ensure_table(conn: &Connection, spec: &TableSpec) -> DbResult<bool> {
    if table_exists(conn, spec.name)? {
        verify_columns(conn, spec)?;
        return Ok(false);
    }

    conn.execute_batch(&create_table_sql(spec))?;
    info!(
        "event=table_create module=db status=ok table={} columns={}",
        spec.name,
        spec.columns.len()
    );
    Ok(true)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn create_table_sql(spec: &TableSpec) -> String {
    let mut columns = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_ident(SEQ_COLUMN)
    )];
    for column in &spec.columns {
        let mut definition = format!(
            "{} {} NOT NULL",
            quote_ident(column.name),
            column.kind.sql_type()
        );
        if column.unique {
            definition.push_str(" UNIQUE");
        }
        columns.push(definition);
    }
    format!(
        "CREATE TABLE {} (\n    {}\n);",
        quote_ident(spec.name),
        columns.join(",\n    ")
    )
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1 COLLATE NOCASE
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn verify_columns(conn: &Connection, spec: &TableSpec) -> DbResult<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quote_ident(spec.name)))?;
    let existing = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>("name")?, row.get::<_, String>("type")?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let unique_columns = single_column_unique_indexes(conn, spec.name)?;

    // SQLite resolves column names case-insensitively.
    for column in &spec.columns {
        let Some((_, declared)) = existing
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column.name))
        else {
            return Err(DbError::MissingColumn {
                table: spec.name.to_string(),
                column: column.name.to_string(),
            });
        };
        if !declared.eq_ignore_ascii_case(column.kind.sql_type()) {
            return Err(DbError::ColumnTypeMismatch {
                table: spec.name.to_string(),
                column: column.name.to_string(),
                expected: column.kind.sql_type(),
                actual: declared.clone(),
            });
        }
        let enforced = unique_columns
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column.name));
        if column.unique && !enforced {
            return Err(DbError::MissingUniqueConstraint {
                table: spec.name.to_string(),
                column: column.name.to_string(),
            });
        }
    }

    if !existing
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case(SEQ_COLUMN))
    {
        return Err(DbError::MissingColumn {
            table: spec.name.to_string(),
            column: SEQ_COLUMN.to_string(),
        });
    }

    Ok(())
}

/// Columns that a full (non-partial) single-column UNIQUE index covers.
fn single_column_unique_indexes(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA index_list({});", quote_ident(table)))?;
    let indexes = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>("name")?,
                row.get::<_, i64>("unique")?,
                row.get::<_, i64>("partial")?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = Vec::new();
    for (index, unique, partial) in indexes {
        if unique != 1 || partial != 0 {
            continue;
        }
        let mut info = conn.prepare(&format!("PRAGMA index_info({});", quote_ident(&index)))?;
        let indexed = info
            .query_map([], |row| row.get::<_, Option<String>>("name"))?
            .collect::<Result<Vec<_>, _>>()?;
        if let [Some(column)] = indexed.as_slice() {
            columns.push(column.clone());
        }
    }
    Ok(columns)
}
