//! Pushes pending entries to the remote and records acknowledgements.
//!
//! Remote failures never escape the background paths: the entry keeps
//! `synced == false` and is picked up again by the next pass. Only
//! [`SyncCoordinator::force_sync`] reports them, for an explicit user action.

use std::sync::Arc;

use crate::connectivity::Connectivity;
use crate::entry::DiaryEntry;
use crate::locks::EntryLocks;
use crate::remote::{PushAck, RemoteEntries, RemoteError};
use crate::store::{EntryStore, StoreError, StorePatch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Cannot sync while offline")]
    Offline,
    #[error("Could not read pending entries: {0}")]
    Store(#[from] StoreError),
    #[error("{} entries failed to sync ({} synced); last error: {last_error}", .report.failed_count, .report.synced_count)]
    Incomplete { report: SyncReport, last_error: String },
    #[error("Sync worker has stopped")]
    WorkerStopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PushOutcome {
    Synced,
    /// Pushed, but the entry was edited or deleted meanwhile.
    Superseded,
    Failed(String),
}

pub struct SyncCoordinator {
    store: Arc<dyn EntryStore>,
    remote: Arc<dyn RemoteEntries>,
    connectivity: Arc<dyn Connectivity>,
    locks: EntryLocks,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn EntryStore>,
        remote: Arc<dyn RemoteEntries>,
        connectivity: Arc<dyn Connectivity>,
        locks: EntryLocks,
    ) -> Self {
        SyncCoordinator {
            store,
            remote,
            connectivity,
            locks,
        }
    }

    pub fn store(&self) -> Arc<dyn EntryStore> {
        Arc::clone(&self.store)
    }

    pub fn locks(&self) -> EntryLocks {
        self.locks.clone()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Push every pending entry once. Offline passes touch nothing.
    pub async fn sync_pending(&self) -> SyncReport {
        if !self.is_online() {
            tracing::debug!("Offline, skipping sync pass");
            return SyncReport::default();
        }
        match self.run_pass().await {
            Ok((report, _)) => report,
            Err(e) => {
                tracing::error!(error = %e, "Could not list pending entries");
                SyncReport::default()
            }
        }
    }

    /// Foreground variant of [`sync_pending`](Self::sync_pending) that
    /// reports being offline and any per-entry failure.
    pub async fn force_sync(&self) -> Result<SyncReport, SyncError> {
        if !self.is_online() {
            return Err(SyncError::Offline);
        }
        let (report, last_error) = self.run_pass().await?;
        match last_error {
            Some(last_error) if report.failed_count > 0 => {
                Err(SyncError::Incomplete { report, last_error })
            }
            _ => Ok(report),
        }
    }

    /// Push one entry if it is still pending. Returns true when it ended up synced.
    pub async fn sync_entry(&self, id: &str) -> bool {
        if !self.is_online() {
            return false;
        }
        let entry = match self.store.get(id).await {
            Ok(Some(entry)) if entry.is_pending() => entry,
            Ok(_) => return false,
            Err(e) => {
                tracing::error!(error = %e, id, "Could not load entry for sync");
                return false;
            }
        };
        self.push_one(entry).await == PushOutcome::Synced
    }

    /// Best-effort remote delete; failures are only logged.
    pub async fn delete_remote(&self, remote_id: &str) {
        if !self.is_online() {
            tracing::info!(remote_id, "Offline, skipping remote delete");
            return;
        }
        match self.remote.delete(remote_id).await {
            Ok(()) => tracing::info!(remote_id, "Deleted remote entry"),
            Err(e) => tracing::warn!(error = %e, remote_id, "Remote delete failed"),
        }
    }

    async fn run_pass(&self) -> Result<(SyncReport, Option<String>), StoreError> {
        let pending = self.store.list_unsynced().await?;
        tracing::info!(pending = pending.len(), "Starting sync pass");

        let mut report = SyncReport::default();
        let mut last_error = None;
        for entry in pending {
            match self.push_one(entry).await {
                PushOutcome::Synced => report.synced_count += 1,
                PushOutcome::Superseded => {}
                PushOutcome::Failed(reason) => {
                    report.failed_count += 1;
                    last_error = Some(reason);
                }
            }
        }
        tracing::info!(
            synced = report.synced_count,
            failed = report.failed_count,
            "Sync pass finished"
        );
        Ok((report, last_error))
    }

    async fn push_one(&self, snapshot: DiaryEntry) -> PushOutcome {
        let ack = match self.remote.push(&snapshot).await {
            Ok(ack) if snapshot.remote_id.is_none() && ack.remote_id.is_none() => {
                Err(RemoteError::MalformedResponse("create acknowledged without an id".to_string()))
            }
            other => other,
        };
        match ack {
            Ok(ack) => match self.record_ack(&snapshot, ack).await {
                Ok((outcome, stray)) => {
                    if let Some(remote_id) = stray {
                        self.delete_remote(&remote_id).await;
                    }
                    outcome
                }
                Err(e) => {
                    tracing::error!(error = %e, id = %snapshot.id, "Could not record sync acknowledgement");
                    PushOutcome::Failed(e.to_string())
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, id = %snapshot.id, "Push failed, entry stays pending");
                PushOutcome::Failed(e.to_string())
            }
        }
    }

    /// Mark the entry synced only if nobody changed it while the push was in
    /// flight; otherwise keep just the remote id so the next pass patches.
    ///
    /// Also returns a remote record to delete: the copy created for an entry
    /// removed mid-push, or a duplicate create that lost the race to another
    /// push. The delete runs after the entry lock is released.
    async fn record_ack(
        &self,
        snapshot: &DiaryEntry,
        ack: PushAck,
    ) -> Result<(PushOutcome, Option<String>), StoreError> {
        let _guard = self.locks.lock(&snapshot.id).await;
        let created = snapshot.remote_id.is_none();

        let Some(current) = self.store.get(&snapshot.id).await? else {
            let orphan = ack.remote_id.filter(|_| created);
            if let Some(orphan) = &orphan {
                tracing::info!(id = %snapshot.id, remote_id = %orphan, "Entry deleted during push, removing remote copy");
            }
            return Ok((PushOutcome::Superseded, orphan));
        };

        // Another push already created the record; this create is a duplicate.
        if let (true, Some(known), Some(acked)) = (created, &current.remote_id, &ack.remote_id) {
            if known != acked {
                tracing::info!(id = %current.id, remote_id = %acked, kept = %known, "Removing duplicate remote copy");
                return Ok((PushOutcome::Superseded, ack.remote_id));
            }
        }

        if current.same_content(snapshot) {
            self.store
                .patch(&current.id, &StorePatch::synced(ack.remote_id.clone()))
                .await?;
            tracing::info!(id = %current.id, remote_id = ?ack.remote_id, "Entry synced");
            return Ok((PushOutcome::Synced, None));
        }

        if let (None, Some(remote_id)) = (&current.remote_id, ack.remote_id) {
            let patch = StorePatch {
                remote_id: Some(remote_id),
                ..Default::default()
            };
            self.store.patch(&current.id, &patch).await?;
        }
        tracing::debug!(id = %current.id, "Entry changed during push, left pending");
        Ok((PushOutcome::Superseded, None))
    }
}
