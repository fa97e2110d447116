//! Entity schemas: field names mapped to typed accessors.
//!
//! # Responsibility
//! - Define the `Entity` contract callers implement for persisted types.
//! - Build and validate `EntitySchema` values once, at registration.
//! - Resolve field names to typed getters and setters at operation time.
//!
//! # Invariants
//! - Entity and field names are SQL-safe identifiers and never `_seq`.
//! - Field names are unique within one schema.
//! - A setter only accepts values of its field's `FieldKind`.

use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod field;
pub(crate) mod registry;

pub use field::{EntitySchema, FieldDef, SchemaBuilder};

/// A type persisted by the store.
///
/// Rows are materialized by starting from `Default::default()` and applying
/// every registered setter, so setters double as row decoders.
///
/// ```
/// use storekit_core::{Entity, SchemaBuilder};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Note {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Note {
///     const ENTITY_NAME: &'static str = "notes";
///
///     fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
///         schema
///             .integer("id", |n| n.id, |n, v| {
///                 n.id = v;
///                 Ok(())
///             })
///             .text("name", |n| n.name.clone(), |n, v| {
///                 n.name = v;
///                 Ok(())
///             })
///             .primary_key("id")
///     }
/// }
/// ```
pub trait Entity: Default + Clone + Send + 'static {
    /// Table name; must be a plain SQL identifier.
    const ENTITY_NAME: &'static str;

    /// Declares the fields of this entity type.
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self>;

    /// Builds and validates the schema for this type.
    fn schema() -> Result<EntitySchema<Self>, SchemaError> {
        Self::describe(SchemaBuilder::new(Self::ENTITY_NAME)).build()
    }
}

/// Storage type of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
        }
    }

    pub(crate) fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field value used for matching and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Integer(_) => FieldKind::Integer,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            Self::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(value) => Ok(ToSqlOutput::from(value.as_str())),
            Self::Integer(value) => Ok(ToSqlOutput::from(*value)),
        }
    }
}

/// Schema declaration and registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidName(String),
    ReservedName(String),
    DuplicateField {
        entity: &'static str,
        field: &'static str,
    },
    NoFields(&'static str),
    UnknownPrimaryKey {
        entity: &'static str,
        field: &'static str,
    },
    /// Another Rust type already registered this entity name.
    EntityNameTaken(&'static str),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "`{name}` is not a valid identifier"),
            Self::ReservedName(name) => write!(f, "`{name}` is reserved by the store"),
            Self::DuplicateField { entity, field } => {
                write!(f, "field `{field}` declared twice on `{entity}`")
            }
            Self::NoFields(entity) => write!(f, "entity `{entity}` declares no fields"),
            Self::UnknownPrimaryKey { entity, field } => {
                write!(f, "primary key `{field}` is not a field of `{entity}`")
            }
            Self::EntityNameTaken(entity) => {
                write!(f, "entity name `{entity}` is registered by another type")
            }
        }
    }
}

impl Error for SchemaError {}

#[cfg(test)]
mod tests {
    use super::{FieldKind, FieldValue};

    #[test]
    fn field_value_conversions_pick_kind() {
        assert_eq!(FieldValue::from("a").kind(), FieldKind::Text);
        assert_eq!(FieldValue::from(String::from("a")).kind(), FieldKind::Text);
        assert_eq!(FieldValue::from(7_i32), FieldValue::Integer(7));
        assert_eq!(FieldValue::from(7_u32).as_integer(), Some(7));
        assert_eq!(FieldValue::from(-3_i64).as_text(), None);
    }

    #[test]
    fn field_value_deserializes_untagged() {
        let values: Vec<FieldValue> = serde_json::from_str(r#"["z", 3]"#).unwrap();
        assert_eq!(
            values,
            vec![FieldValue::Text("z".to_string()), FieldValue::Integer(3)]
        );
    }
}
