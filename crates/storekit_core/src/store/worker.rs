//! Background execution context for asynchronous store operations.
//!
//! # Responsibility
//! - Run queued jobs one at a time on a dedicated thread.
//! - Report each job's outcome through an `AsyncTask` ticket.
//!
//! # Invariants
//! - Jobs run in submission order; one job at a time.
//! - Shutdown drains every queued job before the thread exits.
//! - A dropped ticket never stops its job from running.
//! - A panicking job fails its own ticket only; later jobs still run.

use super::error::{StoreError, StoreResult};
use log::{debug, warn};
use rusqlite::Connection;
use std::sync::mpsc::{self, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Instant;

pub(crate) type JobFn = Box<dyn FnOnce(&mut Connection) -> StoreResult<()> + Send + 'static>;

struct Job {
    op: &'static str,
    entity: &'static str,
    run: JobFn,
    done: Sender<StoreResult<()>>,
}

pub(crate) struct BackgroundWorker {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundWorker {
    pub(crate) fn spawn(thread_name: &str, conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let handle = std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run_jobs(receiver, conn))
            .map_err(|err| {
                StoreError::StoreUnavailable(format!("failed to spawn background worker: {err}"))
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    pub(crate) fn submit(
        &self,
        op: &'static str,
        entity: &'static str,
        run: JobFn,
    ) -> StoreResult<AsyncTask> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            StoreError::StoreUnavailable("background worker is shut down".to_string())
        })?;
        let (done, receiver) = mpsc::channel();
        sender
            .send(Job {
                op,
                entity,
                run,
                done,
            })
            .map_err(|_| StoreError::StoreUnavailable("background worker stopped".to_string()))?;
        debug!("event=async_submit module=store op={op} entity={entity}");
        Ok(AsyncTask { op, receiver })
    }

    /// Closes the queue and waits until every queued job ran.
    pub(crate) fn shutdown(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("event=worker_join module=store status=error error_code=worker_panicked");
            }
        }
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Locks the shared connection, recovering it from an earlier panic.
///
/// A panic inside a transaction body rolls the transaction back while
/// unwinding, so the connection itself is still consistent.
pub(crate) fn lock_connection(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| {
        warn!("event=lock_recover module=store status=ok error_code=lock_poisoned");
        conn.clear_poison();
        poisoned.into_inner()
    })
}

fn run_jobs(receiver: Receiver<Job>, conn: Arc<Mutex<Connection>>) {
    for job in receiver {
        let started_at = Instant::now();
        let Job {
            op,
            entity,
            run,
            done,
        } = job;

        let mut guard = lock_connection(&conn);
        let connection: &mut Connection = &mut guard;
        // The guard outlives the unwind, so a panicking job does not poison
        // the lock or stop this thread.
        let result = panic::catch_unwind(AssertUnwindSafe(|| run(connection)))
            .unwrap_or(Err(StoreError::OperationPanicked { op }));
        drop(guard);

        match &result {
            Ok(()) => debug!(
                "event=async_done module=store status=ok op={op} entity={entity} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=async_done module=store status=error op={op} entity={entity} duration_ms={} error_code={}",
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }

        // The caller may have dropped its ticket.
        let _ = done.send(result);
    }
}

/// Completion ticket for an asynchronous operation.
///
/// Dropping the ticket leaves the operation running unobserved.
pub struct AsyncTask {
    op: &'static str,
    receiver: Receiver<StoreResult<()>>,
}

impl AsyncTask {
    /// Name of the operation this ticket tracks.
    pub fn operation(&self) -> &'static str {
        self.op
    }

    /// Blocks until the operation finished and returns its outcome.
    pub fn wait(self) -> StoreResult<()> {
        self.receiver.recv().map_err(|_| {
            StoreError::StoreUnavailable(format!(
                "background worker stopped before `{}` finished",
                self.op
            ))
        })?
    }

    /// Returns the outcome if the operation already finished.
    ///
    /// The outcome is handed out once; later polls return `None`.
    pub fn poll(&mut self) -> Option<StoreResult<()>> {
        self.receiver.try_recv().ok()
    }
}
