//! Transaction wrapper and the add/delete operations of `Store`.
//!
//! # Responsibility
//! - Run a mutation body between begin and commit, rolling back on error.
//! - Provide sync operations that return after commit and async operations
//!   that run on the store's background worker.
//!
//! # Invariants
//! - Transactions are `IMMEDIATE`: the write lock is taken at begin.
//! - A transaction never outlives the operation call that opened it.
//! - Delete operations act on the record set captured before begin.
//! - `delete_first`/`delete_last` on an empty set fail with `EmptyCollection`.

use super::query::QueryPlan;
use crate::db::catalog::{quote_ident, SEQ_COLUMN};
use crate::schema::{Entity, EntitySchema};
use crate::store::error::{StoreError, StoreResult};
use crate::store::worker::AsyncTask;
use crate::store::Store;
use log::{debug, error, warn};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Runs `body` inside one transaction and commits only if it succeeds.
pub(crate) fn execute_transaction<R>(
    conn: &mut Connection,
    op: &'static str,
    entity: &'static str,
    body: impl FnOnce(&Transaction<'_>) -> StoreResult<R>,
) -> StoreResult<R> {
    let started_at = Instant::now();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    match body(&tx) {
        Ok(value) => {
            tx.commit()?;
            debug!(
                "event=tx_commit module=store status=ok op={op} entity={entity} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                error!(
                    "event=tx_rollback module=store status=error op={op} entity={entity} error_code=rollback_failed error={rollback_err}"
                );
            }
            warn!(
                "event=tx_rollback module=store status=ok op={op} entity={entity} duration_ms={} error_code={}",
                started_at.elapsed().as_millis(),
                err.code()
            );
            Err(err)
        }
    }
}

pub(crate) fn insert_entity<T>(
    conn: &Connection,
    schema: &EntitySchema<T>,
    entity: &T,
) -> StoreResult<()> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| quote_ident(field.name()))
        .collect::<Vec<_>>();
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_ident(schema.entity_name()),
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.execute(params_from_iter(schema.values_of(entity)))?;
    Ok(())
}

/// Writes every field of `entity` back to record `seq`.
///
/// Returns `false` when the record no longer exists.
pub(crate) fn update_entity<T>(
    conn: &Connection,
    schema: &EntitySchema<T>,
    seq: i64,
    entity: &T,
) -> StoreResult<bool> {
    let assignments = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| format!("{} = ?{}", quote_ident(field.name()), index + 1))
        .collect::<Vec<_>>();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{};",
        quote_ident(schema.entity_name()),
        assignments.join(", "),
        quote_ident(SEQ_COLUMN),
        assignments.len() + 1
    );

    let mut values = schema.values_of(entity);
    values.push(seq.into());
    let mut stmt = conn.prepare_cached(&sql)?;
    let changed = stmt.execute(params_from_iter(values))?;
    Ok(changed > 0)
}

/// Deletes the captured records; ones already gone are skipped.
pub(crate) fn delete_records(conn: &Connection, entity: &str, seqs: &[i64]) -> StoreResult<usize> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1;",
        quote_ident(entity),
        quote_ident(SEQ_COLUMN)
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut deleted = 0;
    for seq in seqs {
        deleted += stmt.execute([seq])?;
    }
    Ok(deleted)
}

impl Store {
    /// Adds one record and returns after commit.
    pub fn add<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        let schema = self.schema::<T>()?;
        self.with_conn(|conn| {
            execute_transaction(conn, "add", schema.entity_name(), |tx| {
                insert_entity(tx, &schema, entity)
            })
        })
    }

    /// Adds every record in one transaction; all or none are stored.
    pub fn add_all<T: Entity>(&self, entities: &[T]) -> StoreResult<usize> {
        let schema = self.schema::<T>()?;
        self.with_conn(|conn| {
            execute_transaction(conn, "add_all", schema.entity_name(), |tx| {
                for entity in entities {
                    insert_entity(tx, &schema, entity)?;
                }
                Ok(entities.len())
            })
        })
    }

    /// Queues one all-or-nothing insert of `entities` on the worker.
    pub fn add_async<T: Entity>(&self, entities: Vec<T>) -> StoreResult<AsyncTask> {
        let schema = self.schema::<T>()?;
        let entity_name = schema.entity_name();
        self.submit(
            "add_async",
            entity_name,
            Box::new(move |conn: &mut Connection| {
                execute_transaction(conn, "add_async", entity_name, |tx| {
                    for entity in &entities {
                        insert_entity(tx, &schema, entity)?;
                    }
                    Ok(())
                })
            }),
        )
    }

    /// Deletes every record of `T` present at call time.
    pub fn delete_all<T: Entity>(&self) -> StoreResult<usize> {
        let entity_name = T::ENTITY_NAME;
        let captured = self.capture::<T>()?;
        self.with_conn(|conn| {
            execute_transaction(conn, "delete_all", entity_name, |tx| {
                delete_records(tx, entity_name, &captured)
            })
        })
    }

    /// Captures the current records of `T` now and deletes them on the worker.
    pub fn delete_all_async<T: Entity>(&self) -> StoreResult<AsyncTask> {
        let entity_name = T::ENTITY_NAME;
        let captured = self.capture::<T>()?;
        self.submit(
            "delete_all_async",
            entity_name,
            Box::new(move |conn: &mut Connection| {
                execute_transaction(conn, "delete_all_async", entity_name, |tx| {
                    delete_records(tx, entity_name, &captured).map(|_| ())
                })
            }),
        )
    }

    /// Deletes the earliest-inserted record of `T`.
    pub fn delete_first<T: Entity>(&self) -> StoreResult<()> {
        let captured = self.capture::<T>()?;
        let seq = *captured.first().ok_or(StoreError::EmptyCollection {
            entity: T::ENTITY_NAME,
        })?;
        self.delete_one::<T>("delete_first", seq)
    }

    /// Deletes the latest-inserted record of `T`.
    pub fn delete_last<T: Entity>(&self) -> StoreResult<()> {
        let captured = self.capture::<T>()?;
        let seq = *captured.last().ok_or(StoreError::EmptyCollection {
            entity: T::ENTITY_NAME,
        })?;
        self.delete_one::<T>("delete_last", seq)
    }

    /// Deletes the record at `index` of the current `query_all` order.
    pub fn delete_element<T: Entity>(&self, index: usize) -> StoreResult<()> {
        let captured = self.capture::<T>()?;
        let seq = *captured.get(index).ok_or(StoreError::IndexOutOfRange {
            entity: T::ENTITY_NAME,
            index,
            len: captured.len(),
        })?;
        self.delete_one::<T>("delete_element", seq)
    }

    fn delete_one<T: Entity>(&self, op: &'static str, seq: i64) -> StoreResult<()> {
        let entity_name = T::ENTITY_NAME;
        self.with_conn(|conn| {
            execute_transaction(conn, op, entity_name, |tx| {
                delete_records(tx, entity_name, &[seq]).map(|_| ())
            })
        })
    }

    /// Identities of all current records of `T`, in insertion order.
    fn capture<T: Entity>(&self) -> StoreResult<Vec<i64>> {
        let plan = QueryPlan::all(self.schema::<T>()?);
        self.with_conn(|conn| plan.fetch_seqs(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::{delete_records, execute_transaction};
    use crate::schema::{Entity, SchemaBuilder};
    use crate::store::error::StoreError;
    use crate::store::Store;
    use rusqlite::Connection;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        label: String,
    }

    impl Item {
        fn new(label: &str) -> Self {
            Self {
                label: label.to_string(),
            }
        }
    }

    impl Entity for Item {
        const ENTITY_NAME: &'static str = "items";

        fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            schema.text("label", |i| i.label.clone(), |i, v| {
                i.label = v;
                Ok(())
            })
        }
    }

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn execute_transaction_commits_on_success_and_rolls_back_on_error() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE items (v INTEGER NOT NULL);")
            .unwrap();

        execute_transaction(&mut conn, "test", "items", |tx| {
            tx.execute("INSERT INTO items (v) VALUES (1);", [])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(row_count(&conn), 1);

        let result: Result<(), StoreError> = execute_transaction(&mut conn, "test", "items", |tx| {
            tx.execute("INSERT INTO items (v) VALUES (2);", [])?;
            Err(StoreError::InvalidData("injected".to_string()))
        });
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert_eq!(row_count(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn delete_acts_on_captured_set_only() {
        let mut store = Store::open_in_memory().unwrap();
        store.register::<Item>().unwrap();
        store
            .add_all(&[Item::new("a"), Item::new("b"), Item::new("c")])
            .unwrap();

        let captured = store.capture::<Item>().unwrap();
        assert_eq!(captured.len(), 3);

        // Changes between capture and commit.
        store.delete_element::<Item>(1).unwrap();
        store.add(&Item::new("late")).unwrap();

        let deleted = store
            .with_conn(|conn| {
                execute_transaction(conn, "delete_all", "items", |tx| {
                    delete_records(tx, "items", &captured)
                })
            })
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.query_all::<Item>().unwrap(), vec![Item::new("late")]);
    }
}
