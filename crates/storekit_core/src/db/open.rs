//! Connection bootstrap for file and in-memory stores.
//!
//! # Responsibility
//! - Open the SQLite connection described by a `StoreConfig`.
//! - Apply the connection pragmas the store relies on.
//!
//! # Invariants
//! - Returned connections have a busy timeout set.
//! - File connections run in WAL mode when `wal` is enabled.

use super::DbResult;
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens and configures the connection for `config`.
///
/// # Side effects
/// - Creates the database file when it does not exist yet.
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.location.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.location {
        StoreLocation::Memory => Connection::open_in_memory(),
        StoreLocation::File { path } => Connection::open(path),
    };
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_configure_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure_connection(conn: &Connection, config: &StoreConfig) -> DbResult<()> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    if config.wal && matches!(config.location, StoreLocation::File { .. }) {
        // journal_mode answers with a row, so it cannot go through execute.
        let _mode: String =
            conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    }
    Ok(())
}
