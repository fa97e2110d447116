use super::{FieldKind, FieldValue, SchemaError};
use crate::db::catalog::{ColumnSpec, TableSpec, SEQ_COLUMN};
use crate::store::error::{MutationFailure, StoreError, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_IDENTIFIER_CHARS: usize = 64;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Setter for a text field. `Err` rejects the value.
pub type TextSetter<T> = fn(&mut T, String) -> Result<(), String>;
/// Setter for an integer field. `Err` rejects the value.
pub type IntegerSetter<T> = fn(&mut T, i64) -> Result<(), String>;

enum Accessor<T> {
    Text {
        get: fn(&T) -> String,
        set: TextSetter<T>,
    },
    Integer {
        get: fn(&T) -> i64,
        set: IntegerSetter<T>,
    },
}

/// One registered field: its name plus the typed getter/setter pair.
pub struct FieldDef<T> {
    name: &'static str,
    accessor: Accessor<T>,
    unique: bool,
}

impl<T> FieldDef<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        match self.accessor {
            Accessor::Text { .. } => FieldKind::Text,
            Accessor::Integer { .. } => FieldKind::Integer,
        }
    }

    /// Whether the store enforces uniqueness of this field.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Reads the field from `entity`.
    pub fn read(&self, entity: &T) -> FieldValue {
        match &self.accessor {
            Accessor::Text { get, .. } => FieldValue::Text(get(entity)),
            Accessor::Integer { get, .. } => FieldValue::Integer(get(entity)),
        }
    }

    /// Invokes the setter whose parameter kind matches `value`.
    pub fn write(&self, entity: &mut T, value: FieldValue) -> Result<(), MutationFailure> {
        match (&self.accessor, value) {
            (Accessor::Text { set, .. }, FieldValue::Text(value)) => {
                set(entity, value).map_err(MutationFailure::Rejected)
            }
            (Accessor::Integer { set, .. }, FieldValue::Integer(value)) => {
                set(entity, value).map_err(MutationFailure::Rejected)
            }
            (_, other) => Err(MutationFailure::SetterUnresolved {
                field_kind: self.kind(),
                value_kind: other.kind(),
            }),
        }
    }
}

/// Collects field declarations for one entity type.
pub struct SchemaBuilder<T> {
    entity_name: &'static str,
    fields: Vec<FieldDef<T>>,
    primary_key: Option<&'static str>,
}

impl<T> SchemaBuilder<T> {
    pub fn new(entity_name: &'static str) -> Self {
        Self {
            entity_name,
            fields: Vec::new(),
            primary_key: None,
        }
    }

    pub fn text(mut self, name: &'static str, get: fn(&T) -> String, set: TextSetter<T>) -> Self {
        self.fields.push(FieldDef {
            name,
            accessor: Accessor::Text { get, set },
            unique: false,
        });
        self
    }

    pub fn integer(
        mut self,
        name: &'static str,
        get: fn(&T) -> i64,
        set: IntegerSetter<T>,
    ) -> Self {
        self.fields.push(FieldDef {
            name,
            accessor: Accessor::Integer { get, set },
            unique: false,
        });
        self
    }

    /// Marks `name` as the primary key; duplicates are rejected on write.
    pub fn primary_key(mut self, name: &'static str) -> Self {
        self.primary_key = Some(name);
        self
    }

    /// Validates names and produces the immutable schema.
    pub fn build(mut self) -> Result<EntitySchema<T>, SchemaError> {
        validate_identifier(self.entity_name)?;
        if self.entity_name.to_ascii_lowercase().starts_with("sqlite_") {
            return Err(SchemaError::ReservedName(self.entity_name.to_string()));
        }
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields(self.entity_name));
        }

        for (index, field) in self.fields.iter().enumerate() {
            validate_identifier(field.name)?;
            if field.name.eq_ignore_ascii_case(SEQ_COLUMN) {
                return Err(SchemaError::ReservedName(field.name.to_string()));
            }
            // SQLite column names are case-insensitive.
            let duplicate = self.fields[..index]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(field.name));
            if duplicate {
                return Err(SchemaError::DuplicateField {
                    entity: self.entity_name,
                    field: field.name,
                });
            }
        }

        if let Some(key) = self.primary_key {
            let field = self
                .fields
                .iter_mut()
                .find(|field| field.name == key)
                .ok_or(SchemaError::UnknownPrimaryKey {
                    entity: self.entity_name,
                    field: key,
                })?;
            field.unique = true;
        }

        Ok(EntitySchema {
            entity_name: self.entity_name,
            fields: self.fields,
            primary_key: self.primary_key,
        })
    }
}

/// Validated field map for one entity type.
pub struct EntitySchema<T> {
    entity_name: &'static str,
    fields: Vec<FieldDef<T>>,
    primary_key: Option<&'static str>,
}

impl<T> EntitySchema<T> {
    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef<T>] {
        &self.fields
    }

    pub fn primary_key(&self) -> Option<&'static str> {
        self.primary_key
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef<T>> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Resolves `name`, failing with `FieldNotFound`.
    pub fn require_field(&self, name: &str) -> StoreResult<&FieldDef<T>> {
        self.field(name).ok_or_else(|| StoreError::FieldNotFound {
            entity: self.entity_name,
            field: name.to_string(),
        })
    }

    /// Resolves `name` and checks that `value` has the field's kind.
    pub fn require_comparable(&self, name: &str, value: &FieldValue) -> StoreResult<&FieldDef<T>> {
        let field = self.require_field(name)?;
        if field.kind() != value.kind() {
            return Err(StoreError::FieldTypeMismatch {
                entity: self.entity_name,
                field: field.name,
                expected: field.kind(),
                found: value.kind(),
            });
        }
        Ok(field)
    }

    /// Current values of every field, in declaration order.
    pub(crate) fn values_of(&self, entity: &T) -> Vec<FieldValue> {
        self.fields.iter().map(|field| field.read(entity)).collect()
    }

    pub(crate) fn table_spec(&self) -> TableSpec {
        TableSpec {
            name: self.entity_name,
            columns: self
                .fields
                .iter()
                .map(|field| ColumnSpec {
                    name: field.name,
                    kind: field.kind(),
                    unique: field.unique,
                })
                .collect(),
        }
    }
}

fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    if name.chars().count() > MAX_IDENTIFIER_CHARS || !IDENTIFIER_RE.is_match(name) {
        return Err(SchemaError::InvalidName(name.to_string()));
    }
    Ok(())
}
