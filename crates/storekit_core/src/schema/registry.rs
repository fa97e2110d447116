//! In-process registry of entity schemas keyed by Rust type.

use super::{Entity, EntitySchema, SchemaError};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type AnySchema = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub(crate) struct SchemaRegistry {
    schemas: HashMap<TypeId, AnySchema>,
    names: BTreeMap<&'static str, TypeId>,
}

impl SchemaRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the schema of `T`.
    ///
    /// Registering the same type again returns the existing schema; reusing
    /// an entity name from a different type is rejected.
    pub(crate) fn register<T: Entity>(
        &mut self,
        schema: EntitySchema<T>,
    ) -> Result<Arc<EntitySchema<T>>, SchemaError> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.get::<T>() {
            return Ok(existing);
        }
        if let Some(owner) = self.names.get(schema.entity_name()) {
            if *owner != type_id {
                return Err(SchemaError::EntityNameTaken(schema.entity_name()));
            }
        }

        let schema = Arc::new(schema);
        self.names.insert(schema.entity_name(), type_id);
        self.schemas
            .insert(type_id, Arc::clone(&schema) as AnySchema);
        Ok(schema)
    }

    pub(crate) fn get<T: Entity>(&self) -> Option<Arc<EntitySchema<T>>> {
        let schema = self.schemas.get(&TypeId::of::<T>())?;
        Arc::clone(schema).downcast::<EntitySchema<T>>().ok()
    }

    /// Registered entity names, sorted.
    pub(crate) fn entity_names(&self) -> Vec<&'static str> {
        self.names.keys().copied().collect()
    }
}
