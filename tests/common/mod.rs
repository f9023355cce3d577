#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mood_diary::connectivity::OnlineFlag;
use mood_diary::entry::DEFAULT_MAX_NOTES_CHARS;
use mood_diary::locks::EntryLocks;
use mood_diary::remote::{PushAck, RemoteEntries, RemoteError, RemoteRecord};
use mood_diary::store::{EntryStore, JsonFileStore, SqliteStore, StoreError, StorePatch};
use mood_diary::worker::{SyncHandle, SyncWorker};
use mood_diary::{DiaryEntry, EntryController, SyncCoordinator};
use tokio::sync::Notify;

/// One push as the remote saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    pub notes: String,
    /// `None` for a create, the target id for an update.
    pub target: Option<String>,
}

#[derive(Default)]
struct Recorded {
    pushes: Vec<Push>,
    deletes: Vec<String>,
    next_id: u32,
}

/// Parks the first call through it until released, to interleave local edits.
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
    armed: AtomicBool,
}

impl Gate {
    fn new() -> Self {
        Gate {
            started: Notify::new(),
            release: Notify::new(),
            armed: AtomicBool::new(true),
        }
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
    }
}

/// In-memory remote handing out ids `r1`, `r2`, ... for creates.
#[derive(Default)]
pub struct StubRemote {
    recorded: Mutex<Recorded>,
    always_fail: bool,
    fail_calls: HashSet<usize>,
    calls: AtomicUsize,
    unreachable: AtomicBool,
    gate: Option<Gate>,
    delete_gate: Option<Gate>,
}

impl StubRemote {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        StubRemote {
            always_fail: true,
            ..Default::default()
        }
    }

    /// Fail only the given push calls, counted from 1.
    pub fn failing_on(calls: &[usize]) -> Self {
        StubRemote {
            fail_calls: calls.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// Parks the first push.
    pub fn gated() -> Self {
        StubRemote {
            gate: Some(Gate::new()),
            ..Default::default()
        }
    }

    /// Also park the first delete.
    pub fn with_gated_delete(mut self) -> Self {
        self.delete_gate = Some(Gate::new());
        self
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("remote was not built with a gate")
    }

    pub fn delete_gate(&self) -> &Gate {
        self.delete_gate.as_ref().expect("remote was not built with a delete gate")
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<Push> {
        self.recorded.lock().unwrap().pushes.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.recorded.lock().unwrap().deletes.clone()
    }

    pub fn push_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteEntries for StubRemote {
    async fn push(&self, entry: &DiaryEntry) -> Result<PushAck, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if self.always_fail || self.fail_calls.contains(&call) {
            return Err(RemoteError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        let mut recorded = self.recorded.lock().unwrap();
        recorded.pushes.push(Push {
            notes: entry.notes.clone(),
            target: entry.remote_id.clone(),
        });
        let remote_id = match &entry.remote_id {
            Some(id) => id.clone(),
            None => {
                recorded.next_id += 1;
                format!("r{}", recorded.next_id)
            }
        };
        Ok(PushAck {
            remote_id: Some(remote_id),
        })
    }

    async fn delete(&self, remote_id: &str) -> Result<(), RemoteError> {
        if let Some(gate) = &self.delete_gate {
            gate.pass().await;
        }
        if self.always_fail {
            return Err(RemoteError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.recorded.lock().unwrap().deletes.push(remote_id.to_string());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RemoteRecord>, RemoteError> {
        Ok(Vec::new())
    }

    async fn probe(&self) -> bool {
        !self.unreachable.load(Ordering::SeqCst)
    }
}

/// Store wrapper counting every call that reaches it.
pub struct CountingStore {
    inner: Arc<dyn EntryStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn EntryStore>) -> Self {
        CountingStore {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntryStore for CountingStore {
    async fn insert(&self, entry: &DiaryEntry) -> Result<(), StoreError> {
        self.hit();
        self.inner.insert(entry).await
    }

    async fn patch(&self, id: &str, patch: &StorePatch) -> Result<DiaryEntry, StoreError> {
        self.hit();
        self.inner.patch(id, patch).await
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.hit();
        self.inner.remove(id).await
    }

    async fn list_all(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        self.hit();
        self.inner.list_all().await
    }

    async fn list_unsynced(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        self.hit();
        self.inner.list_unsynced().await
    }

    async fn get(&self, id: &str) -> Result<Option<DiaryEntry>, StoreError> {
        self.hit();
        self.inner.get(id).await
    }
}

/// Fully wired controller over a temp-dir store and a stub remote.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Arc<dyn EntryStore>,
    pub remote: Arc<StubRemote>,
    pub online: OnlineFlag,
    pub coordinator: Arc<SyncCoordinator>,
    pub sync: SyncHandle,
    pub controller: EntryController,
}

impl Harness {
    pub async fn json(remote: StubRemote, online: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("entries.json")).await.unwrap();
        Self::wire(dir, Arc::new(store), remote, online)
    }

    pub async fn sqlite(remote: StubRemote, online: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("entries.db"), None).await.unwrap();
        Self::wire(dir, Arc::new(store), remote, online)
    }

    pub fn wire(
        dir: tempfile::TempDir,
        store: Arc<dyn EntryStore>,
        remote: StubRemote,
        online: bool,
    ) -> Self {
        let remote = Arc::new(remote);
        let online = OnlineFlag::new(online);
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&store),
            remote.clone(),
            Arc::new(online.clone()),
            EntryLocks::new(),
        ));
        let (sync, _worker) = SyncWorker::spawn(coordinator.clone());
        let controller = EntryController::new(coordinator.clone(), sync.clone(), DEFAULT_MAX_NOTES_CHARS);
        Harness {
            dir,
            store,
            remote,
            online,
            coordinator,
            sync,
            controller,
        }
    }

    /// Create entries while offline so nothing syncs until the test says so.
    pub async fn create_offline(&self, notes: &[&str]) -> Vec<DiaryEntry> {
        let was_online = self.online.set(false);
        let mut created = Vec::new();
        for text in notes {
            created.push(self.controller.create_entry(text, None, None, None).await.unwrap());
            // distinct created_at keeps the pass order predictable
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        self.sync.flush().await;
        self.online.set(was_online);
        created
    }

    pub async fn stored(&self, id: &str) -> DiaryEntry {
        self.store.get(id).await.unwrap().expect("entry should exist")
    }
}
