//! Name-driven field updates through registered setters.
//!
//! # Responsibility
//! - Resolve `(entity type, field name, value kind)` to a registered setter.
//! - Apply it to the first or every record matching `field == old_value`.
//!
//! # Invariants
//! - Field and setter resolution happen before any store access.
//! - Matches are captured once, before the transaction opens.
//! - All matches change in one transaction; any failed setter or write rolls
//!   every change back.

use super::query::{ManagedRow, QueryPlan};
use super::transaction::{execute_transaction, update_entity};
use crate::schema::{Entity, EntitySchema, FieldDef, FieldValue};
use crate::store::error::{MutationFailure, StoreError, StoreResult};
use crate::store::Store;
use log::debug;
use std::sync::Arc;

impl Store {
    /// Sets `field` to `new_value` on the earliest record where it equals
    /// `old_value`.
    ///
    /// Returns the number of records changed (0 or 1).
    pub fn update_first_by_field<T: Entity>(
        &self,
        field: &str,
        old_value: impl Into<FieldValue>,
        new_value: impl Into<FieldValue>,
    ) -> StoreResult<usize> {
        self.update_by_field::<T>(
            "update_first_by_field",
            field,
            old_value.into(),
            new_value.into(),
            true,
        )
    }

    /// Sets `field` to `new_value` on every record where it equals
    /// `old_value`, atomically.
    ///
    /// Returns the number of records changed.
    pub fn update_all_by_field<T: Entity>(
        &self,
        field: &str,
        old_value: impl Into<FieldValue>,
        new_value: impl Into<FieldValue>,
    ) -> StoreResult<usize> {
        self.update_by_field::<T>(
            "update_all_by_field",
            field,
            old_value.into(),
            new_value.into(),
            false,
        )
    }

    fn update_by_field<T: Entity>(
        &self,
        op: &'static str,
        field: &str,
        old_value: FieldValue,
        new_value: FieldValue,
        first_only: bool,
    ) -> StoreResult<usize> {
        let schema = self.schema::<T>()?;
        let mut plan = QueryPlan::all(Arc::clone(&schema)).equal_to(field, old_value)?;
        if first_only {
            plan = plan.first_only();
        }
        let setter = resolve_setter(&schema, field, &new_value)?;

        let matches = self.with_conn(|conn| plan.fetch(conn))?;
        if matches.is_empty() {
            debug!(
                "event=field_update module=store status=ok op={op} entity={} field={} changed=0",
                schema.entity_name(),
                setter.name()
            );
            return Ok(0);
        }

        let changed = self.with_conn(|conn| {
            execute_transaction(conn, op, schema.entity_name(), |tx| {
                let mut changed = 0;
                for ManagedRow { seq, mut entity } in matches {
                    setter.write(&mut entity, new_value.clone()).map_err(|cause| {
                        StoreError::MutationInvocation {
                            entity: schema.entity_name(),
                            field: setter.name(),
                            cause,
                        }
                    })?;
                    if update_entity(tx, &schema, seq, &entity)? {
                        changed += 1;
                    }
                }
                Ok(changed)
            })
        })?;

        debug!(
            "event=field_update module=store status=ok op={op} entity={} field={} changed={changed}",
            schema.entity_name(),
            setter.name()
        );
        Ok(changed)
    }
}

/// Finds the setter of `field` that accepts a value of `value`'s kind.
fn resolve_setter<'schema, T>(
    schema: &'schema EntitySchema<T>,
    field: &str,
    value: &FieldValue,
) -> StoreResult<&'schema FieldDef<T>> {
    let target = schema.require_field(field)?;
    if target.kind() != value.kind() {
        return Err(StoreError::MutationInvocation {
            entity: schema.entity_name(),
            field: target.name(),
            cause: MutationFailure::SetterUnresolved {
                field_kind: target.kind(),
                value_kind: value.kind(),
            },
        });
    }
    Ok(target)
}
