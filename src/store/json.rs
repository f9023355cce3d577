use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{sort_newest_first, sort_oldest_created_first, EntryStore, StoreError, StorePatch};
use crate::entry::DiaryEntry;

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreFile {
    pub entries: Vec<DiaryEntry>,
}

/// Whole collection kept in memory and mirrored to one JSON file.
///
/// Every mutation is applied to a copy, written to disk, and only then made
/// visible, so a failed write leaves both memory and file at the old state.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Vec<DiaryEntry>>,
}

impl JsonFileStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let entries = load_from_file(path).await?.unwrap_or_default().entries;
        tracing::debug!(path = %path.display(), count = entries.len(), "Loaded JSON entry store");
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    async fn save_to_file(&self, entries: &[DiaryEntry]) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec(&StoreFile {
            entries: entries.to_vec(),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serialized).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<DiaryEntry>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.save_to_file(&next).await?;
        *guard = next;
        Ok(out)
    }
}

/// `None` when the file does not exist yet.
pub(crate) async fn load_from_file(path: &Path) -> Result<Option<StoreFile>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl EntryStore for JsonFileStore {
    async fn insert(&self, entry: &DiaryEntry) -> Result<(), StoreError> {
        self.mutate(|entries| {
            match entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => entries.push(entry.clone()),
            }
            Ok(())
        })
        .await
    }

    async fn patch(&self, id: &str, patch: &StorePatch) -> Result<DiaryEntry, StoreError> {
        self.mutate(|entries| {
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            patch.apply(entry);
            Ok(entry.clone())
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.mutate(|entries| {
            entries.retain(|e| e.id != id);
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        let mut entries = self.entries.lock().await.clone();
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    async fn list_unsynced(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        let mut pending: Vec<DiaryEntry> = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| !e.synced)
            .cloned()
            .collect();
        sort_oldest_created_first(&mut pending);
        Ok(pending)
    }

    async fn get(&self, id: &str) -> Result<Option<DiaryEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }
}
