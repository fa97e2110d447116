//! Store handle: connection, schema registry and background worker.
//!
//! # Responsibility
//! - Own the single SQLite connection and serialize access to it.
//! - Register entity types and keep their validated schemas.
//! - Host the background worker used by `*_async` operations.
//!
//! # Invariants
//! - The handle is an explicit value; its lifecycle belongs to the caller.
//! - At most one transaction is open at a time, on one connection.
//! - `close` (or drop) drains queued async work before returning.

use crate::config::StoreConfig;
use crate::db::catalog::ensure_table;
use crate::db::open_connection;
use crate::schema::registry::SchemaRegistry;
use crate::schema::{Entity, EntitySchema, SchemaError};
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub mod error;
pub mod worker;

use error::{StoreError, StoreResult};
use worker::{AsyncTask, BackgroundWorker, JobFn};

/// Handle to one opened store.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    registry: SchemaRegistry,
    worker: BackgroundWorker,
    mode: &'static str,
}

impl Store {
    /// Opens the store described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let conn = Arc::new(Mutex::new(open_connection(config)?));
        let worker = BackgroundWorker::spawn(&config.worker_thread_name, Arc::clone(&conn))?;
        Ok(Self {
            conn,
            registry: SchemaRegistry::new(),
            worker,
            mode: config.location.mode(),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    pub fn open_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(&StoreConfig::file(path.as_ref()))
    }

    /// Registers `T`, creating its table or verifying the existing one.
    ///
    /// Registering a type twice is a no-op.
    pub fn register<T: Entity>(&mut self) -> StoreResult<()> {
        if self.registry.get::<T>().is_some() {
            return Ok(());
        }
        let schema = T::schema()?;
        if self.registry.entity_names().contains(&schema.entity_name()) {
            return Err(SchemaError::EntityNameTaken(schema.entity_name()).into());
        }
        let spec = schema.table_spec();
        self.with_conn(|conn| Ok(ensure_table(conn, &spec)?))?;
        let schema = self.registry.register(schema)?;
        info!(
            "event=entity_register module=store status=ok mode={} entity={} fields={}",
            self.mode,
            schema.entity_name(),
            schema.fields().len()
        );
        Ok(())
    }

    /// Names of all registered entity types, sorted.
    pub fn registered_entities(&self) -> Vec<&'static str> {
        self.registry.entity_names()
    }

    /// Waits for queued async work and releases the connection.
    pub fn close(mut self) -> StoreResult<()> {
        self.worker.shutdown();
        info!("event=store_close module=store status=ok mode={}", self.mode);
        Ok(())
    }

    pub(crate) fn schema<T: Entity>(&self) -> StoreResult<Arc<EntitySchema<T>>> {
        self.registry
            .get::<T>()
            .ok_or(StoreError::NotRegistered(T::ENTITY_NAME))
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// A panic inside `f` propagates to the caller; the open transaction is
    /// rolled back while unwinding and the next call recovers the lock.
    pub(crate) fn with_conn<R>(
        &self,
        f: impl FnOnce(&mut Connection) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut guard = worker::lock_connection(&self.conn);
        f(&mut *guard)
    }

    pub(crate) fn submit(
        &self,
        op: &'static str,
        entity: &'static str,
        run: JobFn,
    ) -> StoreResult<AsyncTask> {
        self.worker.submit(op, entity, run)
    }
}
