//! Generic data-access layer over an embedded SQLite store.
//! Callers register entity types once and then use one uniform surface for
//! CRUD, equality queries, sorting and name-driven field updates.

pub mod config;
pub mod db;
pub mod logging;
pub mod ops;
pub mod schema;
pub mod store;

pub use config::{ConfigError, LogConfig, StoreConfig, StoreLocation};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use ops::materialize::LiveResults;
pub use ops::query::SortOrder;
pub use schema::{Entity, EntitySchema, FieldDef, FieldKind, FieldValue, SchemaBuilder, SchemaError};
pub use store::error::{MutationFailure, StoreError, StoreResult};
pub use store::worker::AsyncTask;
pub use store::Store;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
