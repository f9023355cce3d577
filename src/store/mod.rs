//! Durable local storage for diary entries.
//!
//! Every write lands here before any network attempt. Two backends share the
//! [`EntryStore`] contract: SQLite when the platform supports it and a single
//! JSON file otherwise. [`open_store`] picks one at startup.

mod json;
mod sqlite;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::entry::DiaryEntry;
use crate::mood::MoodLabel;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

pub const SQLITE_FILE_NAME: &str = "mood_diary.db";
pub const JSON_FILE_NAME: &str = "diary_entries.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entry {0} not found")]
    NotFound(String),
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize entries: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Partial update of a stored record. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorePatch {
    pub date: Option<DateTime<Utc>>,
    pub mood: Option<MoodLabel>,
    pub intensity: Option<u8>,
    pub notes: Option<String>,
    pub synced: Option<bool>,
    pub remote_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StorePatch {
    /// Acknowledge a successful push.
    pub fn synced(remote_id: Option<String>) -> Self {
        StorePatch {
            synced: Some(true),
            remote_id,
            ..Default::default()
        }
    }

    pub fn apply(&self, entry: &mut DiaryEntry) {
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(mood) = self.mood {
            entry.mood = mood;
        }
        if let Some(intensity) = self.intensity {
            entry.intensity = intensity;
        }
        if let Some(notes) = &self.notes {
            entry.notes = notes.clone();
        }
        if let Some(synced) = self.synced {
            entry.synced = synced;
        }
        if let Some(remote_id) = &self.remote_id {
            entry.remote_id = Some(remote_id.clone());
        }
        if let Some(updated_at) = self.updated_at {
            entry.updated_at = updated_at;
        }
    }
}

/// Keyed record storage. Each call is atomic for the record it touches;
/// there are no multi-record transactions.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert or replace a record by id.
    async fn insert(&self, entry: &DiaryEntry) -> Result<(), StoreError>;

    async fn patch(&self, id: &str, patch: &StorePatch) -> Result<DiaryEntry, StoreError>;

    /// Remove a record. Removing a missing id is not an error.
    async fn remove(&self, id: &str) -> Result<(), StoreError>;

    /// All records, newest `date` first.
    async fn list_all(&self) -> Result<Vec<DiaryEntry>, StoreError>;

    /// Records with `synced == false`, oldest `created_at` first.
    async fn list_unsynced(&self) -> Result<Vec<DiaryEntry>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<DiaryEntry>, StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Auto,
    Sqlite,
    Json,
}

pub(crate) fn sort_newest_first(entries: &mut [DiaryEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
}

pub(crate) fn sort_oldest_created_first(entries: &mut [DiaryEntry]) {
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Open the configured backend inside `data_dir`.
///
/// `Auto` tries SQLite first and falls back to the JSON file store when the
/// database cannot be opened.
pub async fn open_store(
    backend: StorageBackend,
    data_dir: &Path,
) -> Result<Arc<dyn EntryStore>, StoreError> {
    tokio::fs::create_dir_all(data_dir).await?;
    let sqlite_path = data_dir.join(SQLITE_FILE_NAME);
    let json_path = data_dir.join(JSON_FILE_NAME);

    match backend {
        StorageBackend::Sqlite => {
            let store = SqliteStore::open(&sqlite_path, Some(&json_path)).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Json => Ok(Arc::new(JsonFileStore::open(&json_path).await?)),
        StorageBackend::Auto => match SqliteStore::open(&sqlite_path, Some(&json_path)).await {
            Ok(store) => {
                tracing::info!(path = %sqlite_path.display(), "Using SQLite entry store");
                Ok(Arc::new(store))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %json_path.display(),
                    "SQLite unavailable, falling back to JSON file store"
                );
                Ok(Arc::new(JsonFileStore::open(&json_path).await?))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_set_fields() {
        let mut entry = DiaryEntry::new("notes".into(), MoodLabel::Happy, None);
        let original = entry.clone();
        StorePatch::synced(Some("r1".into())).apply(&mut entry);
        assert!(entry.synced);
        assert_eq!(entry.remote_id.as_deref(), Some("r1"));
        assert!(entry.same_content(&original));
    }

    #[test]
    fn sync_ack_without_id_keeps_known_remote_id() {
        let mut entry = DiaryEntry::new("notes".into(), MoodLabel::Happy, None);
        entry.remote_id = Some("r9".into());
        StorePatch::synced(None).apply(&mut entry);
        assert_eq!(entry.remote_id.as_deref(), Some("r9"));
    }

    #[tokio::test]
    async fn auto_backend_opens_a_working_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(StorageBackend::Auto, dir.path()).await.unwrap();
        let entry = DiaryEntry::new("hi".into(), MoodLabel::Neutral, None);
        store.insert(&entry).await.unwrap();
        assert_eq!(store.get(&entry.id).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn json_backend_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(StorageBackend::Json, dir.path()).await.unwrap();
        store
            .insert(&DiaryEntry::new("hi".into(), MoodLabel::Neutral, None))
            .await
            .unwrap();
        assert!(dir.path().join(JSON_FILE_NAME).exists());
        assert!(!dir.path().join(SQLITE_FILE_NAME).exists());
    }
}
