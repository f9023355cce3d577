//! Background sync queue.
//!
//! Callers enqueue jobs and return at once; a single task drains the queue
//! and drives the [`SyncCoordinator`]. Nothing the worker does can fail a
//! caller.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::sync::{SyncCoordinator, SyncError, SyncReport};

#[derive(Debug)]
pub enum SyncJob {
    /// Push one entry if it is still pending.
    Entry(String),
    /// Full pass over every pending entry.
    All,
    /// Best-effort delete of a remote record.
    DeleteRemote(String),
    /// Foreground pass whose outcome is sent back to the caller.
    Force(oneshot::Sender<Result<SyncReport, SyncError>>),
    /// Resolved once every job queued before it has been handled.
    Barrier(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncJob>,
}

impl SyncHandle {
    pub fn enqueue(&self, job: SyncJob) {
        if let Err(e) = self.tx.send(job) {
            tracing::warn!(job = ?e.0, "Sync worker has stopped, job dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Run a full pass on the worker and wait for its outcome. Going through
    /// the queue keeps every push on one task, so an entry is never pushed
    /// twice at once by this process.
    pub async fn force_sync(&self) -> Result<SyncReport, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(SyncJob::Force(tx));
        rx.await.unwrap_or(Err(SyncError::WorkerStopped))
    }

    /// Wait until the worker has handled everything queued so far.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.enqueue(SyncJob::Barrier(tx));
        let _ = rx.await;
    }
}

pub struct SyncWorker;

impl SyncWorker {
    pub fn spawn(coordinator: Arc<SyncCoordinator>) -> (SyncHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(coordinator, rx));
        (SyncHandle { tx }, task)
    }
}

async fn run(coordinator: Arc<SyncCoordinator>, mut rx: mpsc::UnboundedReceiver<SyncJob>) {
    tracing::debug!("Sync worker started");
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(job) = rx.try_recv() {
            batch.push(job);
        }
        for job in plan(batch) {
            match job {
                SyncJob::Entry(id) => {
                    coordinator.sync_entry(&id).await;
                }
                SyncJob::All => {
                    coordinator.sync_pending().await;
                }
                SyncJob::DeleteRemote(remote_id) => coordinator.delete_remote(&remote_id).await,
                SyncJob::Force(reply) => {
                    let _ = reply.send(coordinator.force_sync().await);
                }
                SyncJob::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
    tracing::debug!("Sync worker stopped");
}

/// Order a drained batch: remote deletes first, then forced passes (which
/// cover every pending entry), else one full pass if any was requested,
/// else each distinct entry once; barriers last.
fn plan(batch: Vec<SyncJob>) -> Vec<SyncJob> {
    let mut deletes = Vec::new();
    let mut entries = Vec::new();
    let mut forced = Vec::new();
    let mut barriers = Vec::new();
    let mut seen = HashSet::new();
    let mut full_pass = false;

    for job in batch {
        match job {
            SyncJob::DeleteRemote(remote_id) => {
                if seen.insert(format!("delete:{remote_id}")) {
                    deletes.push(SyncJob::DeleteRemote(remote_id));
                }
            }
            SyncJob::Entry(id) => {
                if seen.insert(format!("entry:{id}")) {
                    entries.push(SyncJob::Entry(id));
                }
            }
            SyncJob::All => full_pass = true,
            force @ SyncJob::Force(_) => forced.push(force),
            barrier @ SyncJob::Barrier(_) => barriers.push(barrier),
        }
    }

    let mut planned = deletes;
    if !forced.is_empty() {
        planned.extend(forced);
    } else if full_pass {
        planned.push(SyncJob::All);
    } else {
        planned.extend(entries);
    }
    planned.extend(barriers);
    planned
}
