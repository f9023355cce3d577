//! Create, edit and delete entries.
//!
//! Each operation validates, writes the local store and only then queues a
//! background sync. The caller gets the locally stored entry back without
//! waiting on the network.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::entry::{validate_intensity, validate_notes, DiaryEntry, EntryPatch, ValidationError};
use crate::insights::MoodSummary;
use crate::locks::EntryLocks;
use crate::mood::{infer, MoodInference, MoodLabel};
use crate::store::{EntryStore, StoreError, StorePatch};
use crate::sync::{SyncCoordinator, SyncError, SyncReport};
use crate::worker::{SyncHandle, SyncJob};

#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Entry {0} not found")]
    NotFound(String),
    #[error("Local storage failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EntryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => EntryError::NotFound(id),
            other => EntryError::Store(other),
        }
    }
}

pub struct EntryController {
    store: Arc<dyn EntryStore>,
    coordinator: Arc<SyncCoordinator>,
    sync: SyncHandle,
    locks: EntryLocks,
    max_notes_chars: usize,
}

impl EntryController {
    pub fn new(coordinator: Arc<SyncCoordinator>, sync: SyncHandle, max_notes_chars: usize) -> Self {
        EntryController {
            store: coordinator.store(),
            locks: coordinator.locks(),
            coordinator,
            sync,
            max_notes_chars,
        }
    }

    /// Live classification for a draft; touches nothing.
    pub fn preview(&self, text: &str) -> MoodInference {
        infer(text)
    }

    pub async fn create_entry(
        &self,
        notes: &str,
        explicit_mood: Option<MoodLabel>,
        intensity: Option<u8>,
        date: Option<DateTime<Utc>>,
    ) -> Result<DiaryEntry, EntryError> {
        validate_notes(notes, self.max_notes_chars)?;
        if let Some(intensity) = intensity {
            validate_intensity(intensity)?;
        }
        let mood = explicit_mood.unwrap_or_else(|| infer(notes).mood);
        let mut entry = DiaryEntry::new(notes.to_string(), mood, date);
        if let Some(intensity) = intensity {
            entry.intensity = intensity;
        }

        self.store.insert(&entry).await?;
        tracing::info!(id = %entry.id, mood = %entry.mood, intensity = entry.intensity, explicit = explicit_mood.is_some(), "Entry created");

        self.sync.enqueue(SyncJob::Entry(entry.id.clone()));
        Ok(entry)
    }

    /// Apply a user edit. Changed notes without an explicit mood are
    /// re-classified. A patch that changes nothing leaves the entry, and its
    /// sync state, untouched.
    pub async fn update_entry(&self, id: &str, patch: EntryPatch) -> Result<DiaryEntry, EntryError> {
        if let Some(notes) = &patch.notes {
            validate_notes(notes, self.max_notes_chars)?;
        }
        if let Some(intensity) = patch.intensity {
            validate_intensity(intensity)?;
        }

        let guard = self.locks.lock(id).await;
        let current = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| EntryError::NotFound(id.to_string()))?;

        let notes = patch.notes.filter(|n| *n != current.notes);
        let mood = patch
            .mood
            .or_else(|| notes.as_deref().map(|n| infer(n).mood))
            .filter(|m| *m != current.mood);
        let intensity = patch.intensity.filter(|i| *i != current.intensity);
        let date = patch.date.filter(|d| *d != current.date);

        if notes.is_none() && mood.is_none() && intensity.is_none() && date.is_none() {
            return Ok(current);
        }

        let store_patch = StorePatch {
            notes,
            mood,
            intensity,
            date,
            synced: Some(false),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self.store.patch(id, &store_patch).await?;
        drop(guard);

        tracing::info!(id, remote_id = ?updated.remote_id, "Entry updated");
        self.sync.enqueue(SyncJob::Entry(updated.id.clone()));
        Ok(updated)
    }

    /// Remove locally right away; the remote copy, if any, is deleted in the
    /// background and its failure never restores the entry.
    pub async fn delete_entry(&self, id: &str) -> Result<(), EntryError> {
        let _guard = self.locks.lock(id).await;
        let current = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| EntryError::NotFound(id.to_string()))?;
        self.store.remove(id).await?;
        tracing::info!(id, "Entry deleted");

        if let Some(remote_id) = current.remote_id {
            self.sync.enqueue(SyncJob::DeleteRemote(remote_id));
        }
        Ok(())
    }

    pub async fn get_entry(&self, id: &str) -> Result<Option<DiaryEntry>, EntryError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list_entries(&self) -> Result<Vec<DiaryEntry>, EntryError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn summary(&self, window: Option<Duration>) -> Result<MoodSummary, EntryError> {
        let entries = self.store.list_all().await?;
        Ok(MoodSummary::from_entries(&entries, window, Utc::now()))
    }

    /// Queue a background pass over all pending entries.
    pub fn request_sync(&self) {
        self.sync.enqueue(SyncJob::All);
    }

    /// Run a pass now, on the sync worker, and report the outcome.
    pub async fn force_sync(&self) -> Result<SyncReport, SyncError> {
        self.sync.force_sync().await
    }

    pub fn is_online(&self) -> bool {
        self.coordinator.is_online()
    }
}
