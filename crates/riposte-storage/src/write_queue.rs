//! Serialized write access to the database.
//!
//! SQLite allows one writer at a time. Instead of letting request handlers
//! contend for the connection lock, every mutation is boxed as a job and
//! sent to a single dedicated writer thread, which applies jobs in arrival
//! order. Callers await the outcome over a oneshot channel, so a failing
//! job reports only to its own caller and the writer keeps going.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rusqlite::{Connection, Transaction};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::error::{Result, StorageError};
use crate::pool::ConnectionPool;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Handle to the writer thread. Cheap to clone.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

impl WriteQueue {
    /// Spawn the writer thread and return a handle to it.
    ///
    /// The thread exits when every handle has been dropped and the backlog
    /// is drained, or when the connection lock is poisoned.
    pub fn new(pool: ConnectionPool) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));

        std::thread::Builder::new()
            .name("riposte-writer".to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    match pool.get() {
                        Ok(mut conn) => job(&mut conn),
                        Err(e) => {
                            error!("Write queue lost database access: {}", e);
                            break;
                        }
                    }
                }
                debug!("Write queue drained, writer thread exiting");
            })?;

        Ok(Self { tx, pending })
    }

    /// Run a write job on the writer thread and await its result.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let gauge = Arc::clone(&self.pending);

        // The gauge drops before the reply is sent, so a caller that has
        // awaited its result never observes its own job as still pending.
        let job: Job = Box::new(move |conn| {
            let result = f(conn);
            gauge.fetch_sub(1, Ordering::Relaxed);
            let _ = reply_tx.send(result);
        });

        self.pending.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            return Err(StorageError::QueueClosed);
        }

        reply_rx.await.map_err(|_| StorageError::QueueClosed)?
    }

    /// Run a write job inside a transaction. Rolls back if the job errors.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
    }

    /// Number of jobs submitted but not yet completed.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// True when no jobs are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
