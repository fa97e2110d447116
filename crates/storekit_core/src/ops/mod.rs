//! Store operations: transactions, queries, field mutation and result shaping.
//!
//! # Responsibility
//! - `transaction`: add/delete wrapped in begin/commit, sync or on the worker.
//! - `query`: equality filters and sorting over registered fields.
//! - `mutate`: first-match and all-match field updates through registered setters.
//! - `materialize`: detached snapshots and live, store-bound collections.
//!
//! # Invariants
//! - Target record sets are captured before the transaction opens.
//! - Field names and value kinds are checked before any store access.
//! - A failure inside a transaction rolls the whole transaction back.

pub mod materialize;
pub mod mutate;
pub mod query;
pub mod transaction;
