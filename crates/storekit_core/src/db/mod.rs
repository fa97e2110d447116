//! SQLite connection bootstrap and entity table catalog.
//!
//! # Responsibility
//! - Open and configure the single connection owned by a `Store`.
//! - Create entity tables on registration and verify existing ones.
//!
//! # Invariants
//! - Existing tables are never altered; a column mismatch is an error.
//! - Every entity table carries the hidden insertion-order column `_seq`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog;
mod open;

pub use open::open_connection;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// An existing table does not carry a column the schema declares.
    MissingColumn {
        table: String,
        column: String,
    },
    /// An existing column is declared with a different SQL type.
    ColumnTypeMismatch {
        table: String,
        column: String,
        expected: &'static str,
        actual: String,
    },
    /// A column declared unique is not covered by a single-column UNIQUE
    /// constraint in the existing table.
    MissingUniqueConstraint {
        table: String,
        column: String,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::ColumnTypeMismatch {
                table,
                column,
                expected,
                actual,
            } => write!(
                f,
                "column `{table}.{column}` is declared `{actual}`, expected `{expected}`"
            ),
            Self::MissingUniqueConstraint { table, column } => {
                write!(f, "column `{table}.{column}` is not declared UNIQUE")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MissingColumn { .. }
            | Self::ColumnTypeMismatch { .. }
            | Self::MissingUniqueConstraint { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
