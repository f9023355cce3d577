use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::json::load_from_file;
use super::{EntryStore, StoreError, StorePatch};
use crate::entry::{DiaryEntry, DEFAULT_INTENSITY, MAX_INTENSITY};
use crate::mood::MoodLabel;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    mood TEXT NOT NULL,
    intensity INTEGER NOT NULL DEFAULT 70,
    notes TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    remote_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entries_synced ON entries (synced, created_at);
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const MIGRATED_KEY: &str = "legacy_json_migrated";

const COLUMNS: &str = "id, date, mood, notes, synced, remote_id, created_at, updated_at, intensity";

/// Entry store on an embedded SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}

struct RawRow {
    id: String,
    date: String,
    mood: String,
    notes: String,
    synced: bool,
    remote_id: Option<String>,
    created_at: String,
    updated_at: String,
    intensity: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRow {
            id: row.get(0)?,
            date: row.get(1)?,
            mood: row.get(2)?,
            notes: row.get(3)?,
            synced: row.get::<_, i64>(4)? != 0,
            remote_id: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            intensity: row.get(8)?,
        })
    }

    fn into_entry(self) -> Result<DiaryEntry, StoreError> {
        let mood = self.mood.parse::<MoodLabel>().map_err(|_| StoreError::Corrupt {
            id: self.id.clone(),
            reason: format!("unknown mood {:?}", self.mood),
        })?;
        let intensity = u8::try_from(self.intensity)
            .ok()
            .filter(|v| *v <= MAX_INTENSITY)
            .ok_or_else(|| StoreError::Corrupt {
                id: self.id.clone(),
                reason: format!("intensity {} out of range", self.intensity),
            })?;
        Ok(DiaryEntry {
            date: parse_timestamp(&self.id, &self.date)?,
            created_at: parse_timestamp(&self.id, &self.created_at)?,
            updated_at: parse_timestamp(&self.id, &self.updated_at)?,
            mood,
            intensity,
            notes: self.notes,
            synced: self.synced,
            remote_id: self.remote_id,
            id: self.id,
        })
    }
}

fn insert_row(conn: &Connection, entry: &DiaryEntry) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("INSERT OR REPLACE INTO entries ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            entry.id,
            timestamp(&entry.date),
            entry.mood.as_str(),
            entry.notes,
            entry.synced as i64,
            entry.remote_id,
            timestamp(&entry.created_at),
            timestamp(&entry.updated_at),
            entry.intensity,
        ],
    )
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<DiaryEntry>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(args, RawRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(RawRow::into_entry).collect()
}

/// Databases written before `intensity` existed get the column with its default.
fn add_intensity_column(conn: &Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(entries)")?;
    let has_column = stmt
        .query_map([], |r| r.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .iter()
        .any(|name| name == "intensity");
    if !has_column {
        conn.execute(
            &format!("ALTER TABLE entries ADD COLUMN intensity INTEGER NOT NULL DEFAULT {DEFAULT_INTENSITY}"),
            [],
        )?;
        tracing::info!("Added intensity column to entries table");
    }
    Ok(())
}

fn mark_migrated(conn: &Connection) {
    if let Err(e) = conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![MIGRATED_KEY, timestamp(&Utc::now())],
    ) {
        tracing::warn!(error = %e, "Could not record legacy migration");
    }
}

fn select_one(conn: &Connection, id: &str) -> Result<Option<DiaryEntry>, StoreError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM entries WHERE id = ?1"),
        params![id],
        RawRow::from_row,
    )
    .optional()?
    .map(RawRow::into_entry)
    .transpose()
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`. When the database
    /// is empty and `legacy_json` points at an existing JSON entry file, its
    /// records are imported once.
    pub async fn open(path: &Path, legacy_json: Option<&Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn, legacy_json).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None).await
    }

    async fn init(conn: Connection, legacy_json: Option<&Path>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        add_intensity_column(&conn)?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        if let Some(legacy) = legacy_json {
            store.migrate_from_json(legacy).await;
        }
        Ok(store)
    }

    /// One-shot import of a JSON entry file into an empty database. Never
    /// fails the open: problems are logged and the store starts as it is.
    async fn migrate_from_json(&self, legacy: &Path) {
        let file = match load_from_file(legacy).await {
            Ok(Some(file)) => file,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %legacy.display(),
                    "Legacy entry file unreadable, skipping migration"
                );
                return;
            }
        };

        let conn = self.conn.lock().await;
        let state = conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![MIGRATED_KEY], |r| {
                r.get::<_, String>(0)
            })
            .optional()
            .and_then(|done| {
                let existing: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))?;
                Ok((done.is_some(), existing))
            });
        match state {
            Ok((false, 0)) => {}
            Ok(_) => {
                mark_migrated(&conn);
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not inspect database before migration");
                return;
            }
        }

        let total = file.entries.len();
        let mut imported = 0usize;
        for entry in &file.entries {
            match insert_row(&conn, entry) {
                Ok(_) => imported += 1,
                Err(e) => tracing::warn!(error = %e, id = %entry.id, "Failed to migrate entry"),
            }
        }
        mark_migrated(&conn);
        tracing::info!(imported, total, "Migrated legacy JSON entries into SQLite");
    }
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn insert(&self, entry: &DiaryEntry) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        insert_row(&conn, entry)?;
        Ok(())
    }

    async fn patch(&self, id: &str, patch: &StorePatch) -> Result<DiaryEntry, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let mut entry = select_one(&tx, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(&mut entry);
        insert_row(&tx, &entry)?;
        tx.commit()?;
        Ok(entry)
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        let conn = self.conn.lock().await;
        query_entries(
            &conn,
            &format!("SELECT {COLUMNS} FROM entries ORDER BY date DESC, id ASC"),
            params![],
        )
    }

    async fn list_unsynced(&self) -> Result<Vec<DiaryEntry>, StoreError> {
        let conn = self.conn.lock().await;
        query_entries(
            &conn,
            &format!("SELECT {COLUMNS} FROM entries WHERE synced = 0 ORDER BY created_at ASC, id ASC"),
            params![],
        )
    }

    async fn get(&self, id: &str) -> Result<Option<DiaryEntry>, StoreError> {
        let conn = self.conn.lock().await;
        select_one(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::json::StoreFile;

    #[tokio::test]
    async fn round_trips_entry_exactly() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let mut entry = DiaryEntry::new("rainy day".into(), MoodLabel::Sad, None);
        entry.remote_id = Some("r1".into());
        entry.intensity = 35;
        store.insert(&entry).await.unwrap();
        assert_eq!(store.get(&entry.id).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn older_database_gains_intensity_column() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("mood_diary.db");
        {
            let conn = Connection::open(&db).unwrap();
            conn.execute_batch(
                "CREATE TABLE entries (
                    id TEXT PRIMARY KEY,
                    date TEXT NOT NULL,
                    mood TEXT NOT NULL,
                    notes TEXT NOT NULL,
                    synced INTEGER NOT NULL DEFAULT 0,
                    remote_id TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                INSERT INTO entries VALUES ('a', '2024-05-01T10:00:00Z', 'Tired', 'quiet',
                    1, 'r1', '2024-05-01T10:00:00Z', '2024-05-01T10:00:00Z');",
            )
            .unwrap();
        }

        let store = SqliteStore::open(&db, None).await.unwrap();
        let entry = store.get("a").await.unwrap().unwrap();
        assert_eq!(entry.intensity, DEFAULT_INTENSITY);
        assert_eq!(entry.mood, MoodLabel::Tired);
        assert!(entry.synced);
    }

    #[tokio::test]
    async fn patch_updates_sync_state() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let entry = DiaryEntry::new("note".into(), MoodLabel::Tired, None);
        store.insert(&entry).await.unwrap();

        let patched = store
            .patch(&entry.id, &StorePatch::synced(Some("r7".into())))
            .await
            .unwrap();
        assert!(patched.synced);
        assert_eq!(patched.remote_id.as_deref(), Some("r7"));
        assert!(store.list_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_missing_is_ok() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.remove("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn migrates_legacy_json_once() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("diary_entries.json");
        let old = DiaryEntry::new("from before".into(), MoodLabel::Happy, None);
        let file = StoreFile {
            entries: vec![old.clone()],
        };
        std::fs::write(&legacy, serde_json::to_vec(&file).unwrap()).unwrap();

        let db = dir.path().join("mood_diary.db");
        let store = SqliteStore::open(&db, Some(&legacy)).await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), vec![old.clone()]);

        store.remove(&old.id).await.unwrap();
        store
            .insert(&DiaryEntry::new("new".into(), MoodLabel::Sad, None))
            .await
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&db, Some(&legacy)).await.unwrap();
        let notes: Vec<String> = reopened
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.notes)
            .collect();
        assert_eq!(notes, vec!["new"]);

        // emptying the diary must not bring the legacy entries back
        reopened.remove(&reopened.list_all().await.unwrap()[0].id).await.unwrap();
        drop(reopened);
        let again = SqliteStore::open(&db, Some(&legacy)).await.unwrap();
        assert!(again.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_legacy_file_does_not_block_open() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("diary_entries.json");
        std::fs::write(&legacy, b"{ not json").unwrap();
        let store = SqliteStore::open(&dir.path().join("db.sqlite"), Some(&legacy))
            .await
            .unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
