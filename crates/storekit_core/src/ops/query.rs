//! Equality filters, sorting and the read-side operations of `Store`.
//!
//! # Responsibility
//! - Build one SELECT per plan from validated field names.
//! - Decode rows into entities through the registered setters.
//!
//! # Invariants
//! - Rows come back in insertion order unless a sort field is set; sort ties
//!   keep insertion order.
//! - Descending results are the element-wise reverse of ascending ones.
//! - Zero matches is an empty result, never an error.

use super::materialize::{detach, LiveResults};
use crate::db::catalog::{quote_ident, SEQ_COLUMN};
use crate::schema::{Entity, EntitySchema, FieldKind, FieldValue};
use crate::store::error::{StoreError, StoreResult};
use crate::store::Store;
use log::debug;
use rusqlite::{params_from_iter, Connection};
use std::sync::Arc;
use std::time::Instant;

/// Direction for `Store::query_all_sorted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A row still tied to its stored record through `_seq`.
pub(crate) struct ManagedRow<T> {
    pub(crate) seq: i64,
    pub(crate) entity: T,
}

/// Validated description of one read against an entity table.
pub(crate) struct QueryPlan<T> {
    schema: Arc<EntitySchema<T>>,
    filter: Option<(&'static str, FieldValue)>,
    sort_field: Option<&'static str>,
    first_only: bool,
}

impl<T> Clone for QueryPlan<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            filter: self.filter.clone(),
            sort_field: self.sort_field,
            first_only: self.first_only,
        }
    }
}

impl<T: Entity> QueryPlan<T> {
    pub(crate) fn all(schema: Arc<EntitySchema<T>>) -> Self {
        Self {
            schema,
            filter: None,
            sort_field: None,
            first_only: false,
        }
    }

    /// Restricts the plan to records whose `field` equals `value`.
    pub(crate) fn equal_to(mut self, field: &str, value: FieldValue) -> StoreResult<Self> {
        let field = self.schema.require_comparable(field, &value)?.name();
        self.filter = Some((field, value));
        Ok(self)
    }

    /// Orders by `field` ascending, ties by insertion order.
    pub(crate) fn sorted_by(mut self, field: &str) -> StoreResult<Self> {
        let field = self.schema.require_field(field)?.name();
        self.sort_field = Some(field);
        Ok(self)
    }

    pub(crate) fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    pub(crate) fn entity_name(&self) -> &'static str {
        self.schema.entity_name()
    }

    pub(crate) fn fetch(&self, conn: &Connection) -> StoreResult<Vec<ManagedRow<T>>> {
        let mut projection = vec![quote_ident(SEQ_COLUMN)];
        projection.extend(
            self.schema
                .fields()
                .iter()
                .map(|field| quote_ident(field.name())),
        );
        let (sql, binds) = self.select_sql(&projection.join(", "), true);

        let mut stmt = conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds.iter()))?;
        let mut managed = Vec::new();
        while let Some(row) = rows.next()? {
            let seq: i64 = row.get(0)?;
            let mut entity = T::default();
            for (offset, field) in self.schema.fields().iter().enumerate() {
                let column = offset + 1;
                let value = match field.kind() {
                    FieldKind::Text => FieldValue::Text(row.get(column)?),
                    FieldKind::Integer => FieldValue::Integer(row.get(column)?),
                };
                field.write(&mut entity, value).map_err(|cause| {
                    StoreError::InvalidData(format!(
                        "`{}.{}` of record {seq}: {cause}",
                        self.entity_name(),
                        field.name()
                    ))
                })?;
            }
            managed.push(ManagedRow { seq, entity });
        }
        Ok(managed)
    }

    /// Record identities matching the plan, in result order.
    pub(crate) fn fetch_seqs(&self, conn: &Connection) -> StoreResult<Vec<i64>> {
        let (sql, binds) = self.select_sql(&quote_ident(SEQ_COLUMN), true);
        let mut stmt = conn.prepare_cached(&sql)?;
        let seqs = stmt
            .query_map(params_from_iter(binds.iter()), |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(seqs)
    }

    pub(crate) fn count(&self, conn: &Connection) -> StoreResult<usize> {
        let (sql, binds) = self.select_sql("COUNT(*)", false);
        let count: i64 = conn.query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
        let count = usize::try_from(count).unwrap_or(0);
        Ok(if self.first_only { count.min(1) } else { count })
    }

    fn select_sql(&self, projection: &str, ordered: bool) -> (String, Vec<FieldValue>) {
        let mut sql = format!(
            "SELECT {projection} FROM {}",
            quote_ident(self.schema.entity_name())
        );
        let mut binds = Vec::new();

        if let Some((field, value)) = &self.filter {
            sql.push_str(&format!(" WHERE {} = ?1", quote_ident(field)));
            binds.push(value.clone());
        }

        if ordered {
            sql.push_str(" ORDER BY ");
            if let Some(field) = self.sort_field {
                sql.push_str(&format!("{} ASC, ", quote_ident(field)));
            }
            sql.push_str(&format!("{} ASC", quote_ident(SEQ_COLUMN)));
            if self.first_only {
                sql.push_str(" LIMIT 1");
            }
        }

        (sql, binds)
    }
}

impl Store {
    /// All records of `T`, detached, in insertion order.
    pub fn query_all<T: Entity>(&self) -> StoreResult<Vec<T>> {
        let plan = QueryPlan::all(self.schema::<T>()?);
        self.run_detached("query_all", &plan)
    }

    /// All records of `T` as a live collection.
    ///
    /// Nothing is read until the collection is first accessed.
    pub fn query_all_async<T: Entity>(&self) -> StoreResult<LiveResults<'_, T>> {
        let plan = QueryPlan::all(self.schema::<T>()?);
        Ok(LiveResults::new(self, plan))
    }

    pub fn query_all_by_ascending<T: Entity>(&self, field: &str) -> StoreResult<Vec<T>> {
        self.query_all_sorted(field, SortOrder::Ascending)
    }

    pub fn query_all_by_descending<T: Entity>(&self, field: &str) -> StoreResult<Vec<T>> {
        self.query_all_sorted(field, SortOrder::Descending)
    }

    /// All records of `T` ordered by `field`, detached.
    ///
    /// Ascending breaks ties by insertion order; descending is the exact
    /// reverse of the ascending result.
    pub fn query_all_sorted<T: Entity>(&self, field: &str, order: SortOrder) -> StoreResult<Vec<T>> {
        let plan = QueryPlan::all(self.schema::<T>()?).sorted_by(field)?;
        let mut entities = self.run_detached("query_all_sorted", &plan)?;
        if order == SortOrder::Descending {
            entities.reverse();
        }
        Ok(entities)
    }

    /// Earliest-inserted record whose `field` equals `value`, if any.
    pub fn query_by_field_first<T: Entity>(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> StoreResult<Option<T>> {
        let plan = QueryPlan::all(self.schema::<T>()?)
            .equal_to(field, value.into())?
            .first_only();
        Ok(self
            .run_detached("query_by_field_first", &plan)?
            .into_iter()
            .next())
    }

    /// Every record whose `field` equals `value`, detached.
    pub fn query_by_field_all<T: Entity>(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> StoreResult<Vec<T>> {
        let plan = QueryPlan::all(self.schema::<T>()?).equal_to(field, value.into())?;
        self.run_detached("query_by_field_all", &plan)
    }

    /// Every record whose `field` equals `value`, as a live collection.
    pub fn query_by_field_all_async<T: Entity>(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> StoreResult<LiveResults<'_, T>> {
        let plan = QueryPlan::all(self.schema::<T>()?).equal_to(field, value.into())?;
        Ok(LiveResults::new(self, plan))
    }

    /// Number of stored records of `T`.
    pub fn count<T: Entity>(&self) -> StoreResult<usize> {
        let plan = QueryPlan::all(self.schema::<T>()?);
        self.with_conn(|conn| plan.count(conn))
    }

    fn run_detached<T: Entity>(&self, op: &'static str, plan: &QueryPlan<T>) -> StoreResult<Vec<T>> {
        let started_at = Instant::now();
        let rows = self.with_conn(|conn| plan.fetch(conn))?;
        debug!(
            "event=query module=store status=ok op={op} entity={} count={} duration_ms={}",
            plan.entity_name(),
            rows.len(),
            started_at.elapsed().as_millis()
        );
        Ok(detach(rows))
    }
}
