//! Error taxonomy for store operations.

use crate::config::ConfigError;
use crate::db::DbError;
use crate::schema::{FieldKind, SchemaError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Why a field setter could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationFailure {
    /// No setter for the field accepts a value of this kind.
    SetterUnresolved {
        field_kind: FieldKind,
        value_kind: FieldKind,
    },
    /// The setter refused the value.
    Rejected(String),
}

impl Display for MutationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetterUnresolved {
                field_kind,
                value_kind,
            } => write!(
                f,
                "no {value_kind} setter for {field_kind} field"
            ),
            Self::Rejected(message) => write!(f, "setter rejected value: {message}"),
        }
    }
}

impl Error for MutationFailure {}

#[derive(Debug)]
pub enum StoreError {
    FieldNotFound {
        entity: &'static str,
        field: String,
    },
    FieldTypeMismatch {
        entity: &'static str,
        field: &'static str,
        expected: FieldKind,
        found: FieldKind,
    },
    MutationInvocation {
        entity: &'static str,
        field: &'static str,
        cause: MutationFailure,
    },
    IndexOutOfRange {
        entity: &'static str,
        index: usize,
        len: usize,
    },
    EmptyCollection {
        entity: &'static str,
    },
    StoreUnavailable(String),
    /// A caller-supplied getter or setter panicked; the transaction was
    /// rolled back.
    OperationPanicked {
        op: &'static str,
    },
    NotRegistered(&'static str),
    Schema(SchemaError),
    Config(ConfigError),
    Db(DbError),
    /// A persisted row could not be materialized into its entity type.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldNotFound { entity, field } => {
                write!(f, "entity `{entity}` has no field `{field}`")
            }
            Self::FieldTypeMismatch {
                entity,
                field,
                expected,
                found,
            } => write!(
                f,
                "field `{entity}.{field}` is {expected}, got a {found} value"
            ),
            Self::MutationInvocation {
                entity,
                field,
                cause,
            } => write!(f, "failed to set `{entity}.{field}`: {cause}"),
            Self::IndexOutOfRange { entity, index, len } => write!(
                f,
                "index {index} out of range for `{entity}` with {len} records"
            ),
            Self::EmptyCollection { entity } => write!(f, "no `{entity}` records to delete"),
            Self::StoreUnavailable(message) => write!(f, "store unavailable: {message}"),
            Self::OperationPanicked { op } => write!(f, "`{op}` panicked and was rolled back"),
            Self::NotRegistered(entity) => write!(f, "entity type `{entity}` is not registered"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl StoreError {
    /// Stable identifier for log events.
    ///
    /// Unlike `Display`, it never carries caller-supplied text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FieldNotFound { .. } => "field_not_found",
            Self::FieldTypeMismatch { .. } => "field_type_mismatch",
            Self::MutationInvocation {
                cause: MutationFailure::SetterUnresolved { .. },
                ..
            } => "setter_unresolved",
            Self::MutationInvocation {
                cause: MutationFailure::Rejected(_),
                ..
            } => "setter_rejected",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::EmptyCollection { .. } => "empty_collection",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::OperationPanicked { .. } => "operation_panicked",
            Self::NotRegistered(_) => "not_registered",
            Self::Schema(_) => "schema_invalid",
            Self::Config(_) => "config_invalid",
            Self::Db(_) => "db_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MutationInvocation { cause, .. } => Some(cause),
            Self::Schema(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::FieldNotFound { .. }
            | Self::FieldTypeMismatch { .. }
            | Self::IndexOutOfRange { .. }
            | Self::EmptyCollection { .. }
            | Self::StoreUnavailable(_)
            | Self::OperationPanicked { .. }
            | Self::NotRegistered(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<SchemaError> for StoreError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
