//! Result shaping: detached snapshots and live collections.
//!
//! # Responsibility
//! - Copy managed rows out of the store as plain owned values.
//! - Provide `LiveResults`, a collection that always reflects the store.
//!
//! # Invariants
//! - A detached `Vec<T>` never changes after it is returned.
//! - `LiveResults` is never written to by this crate.
//! - `LiveResults` is neither `Send` nor `Sync`; it stays on the thread that
//!   created it.

use super::query::{ManagedRow, QueryPlan};
use crate::schema::Entity;
use crate::store::error::StoreResult;
use crate::store::Store;
use std::marker::PhantomData;

pub(crate) fn detach<T>(rows: Vec<ManagedRow<T>>) -> Vec<T> {
    rows.into_iter().map(|row| row.entity).collect()
}

/// Query result bound to its store.
///
/// Every read re-evaluates the query, so records committed after the
/// collection was created (including by async operations) are visible.
///
/// A live collection stays on the thread that created it:
///
/// ```compile_fail
/// # use storekit_core::{Entity, SchemaBuilder, Store};
/// # #[derive(Debug, Clone, Default)]
/// # struct Note {
/// #     name: String,
/// # }
/// # impl Entity for Note {
/// #     const ENTITY_NAME: &'static str = "notes";
/// #     fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
/// #         schema.text("name", |n| n.name.clone(), |n, v| {
/// #             n.name = v;
/// #             Ok(())
/// #         })
/// #     }
/// # }
/// let mut store = Store::open_in_memory().unwrap();
/// store.register::<Note>().unwrap();
/// let live = store.query_all_async::<Note>().unwrap();
/// std::thread::scope(|scope| {
///     scope.spawn(move || live.len().unwrap());
/// });
/// ```
///
/// Take a detached snapshot to hand results to another thread:
///
/// ```
/// # use storekit_core::{Entity, SchemaBuilder, Store};
/// # #[derive(Debug, Clone, Default)]
/// # struct Note {
/// #     name: String,
/// # }
/// # impl Entity for Note {
/// #     const ENTITY_NAME: &'static str = "notes";
/// #     fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
/// #         schema.text("name", |n| n.name.clone(), |n, v| {
/// #             n.name = v;
/// #             Ok(())
/// #         })
/// #     }
/// # }
/// let mut store = Store::open_in_memory().unwrap();
/// store.register::<Note>().unwrap();
/// let live = store.query_all_async::<Note>().unwrap();
/// let snapshot = live.snapshot().unwrap();
/// std::thread::scope(|scope| {
///     scope.spawn(move || assert!(snapshot.is_empty()));
/// });
/// ```
pub struct LiveResults<'store, T: Entity> {
    store: &'store Store,
    plan: QueryPlan<T>,
    _confined: PhantomData<*const ()>,
}

impl<'store, T: Entity> LiveResults<'store, T> {
    pub(crate) fn new(store: &'store Store, plan: QueryPlan<T>) -> Self {
        Self {
            store,
            plan,
            _confined: PhantomData,
        }
    }

    pub fn entity_name(&self) -> &'static str {
        self.plan.entity_name()
    }

    pub fn len(&self) -> StoreResult<usize> {
        self.store.with_conn(|conn| self.plan.count(conn))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Record at `index` in the current result, if present.
    pub fn get(&self, index: usize) -> StoreResult<Option<T>> {
        Ok(self.snapshot()?.into_iter().nth(index))
    }

    pub fn first(&self) -> StoreResult<Option<T>> {
        self.get(0)
    }

    pub fn last(&self) -> StoreResult<Option<T>> {
        Ok(self.snapshot()?.pop())
    }

    /// Copies the current result out as a detached snapshot.
    pub fn snapshot(&self) -> StoreResult<Vec<T>> {
        let rows = self.store.with_conn(|conn| self.plan.fetch(conn))?;
        Ok(detach(rows))
    }
}
