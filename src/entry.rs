use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mood::MoodLabel;

pub const DEFAULT_MAX_NOTES_CHARS: usize = 10_000;
/// How strongly the mood is felt, 0..=100. New entries start here.
pub const DEFAULT_INTENSITY: u8 = 70;
pub const MAX_INTENSITY: u8 = 100;

fn default_intensity() -> u8 {
    DEFAULT_INTENSITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: String,
    /// When the user says the entry happened; editable.
    pub date: DateTime<Utc>,
    #[serde(alias = "moodLabel")]
    pub mood: MoodLabel,
    #[serde(default = "default_intensity")]
    pub intensity: u8,
    pub notes: String,
    #[serde(default)]
    pub synced: bool,
    #[serde(default, alias = "remoteId")]
    pub remote_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiaryEntry {
    pub fn new(notes: String, mood: MoodLabel, date: Option<DateTime<Utc>>) -> Self {
        let now = Utc::now();
        DiaryEntry {
            id: Uuid::new_v4().to_string(),
            date: date.unwrap_or(now),
            mood,
            intensity: DEFAULT_INTENSITY,
            notes,
            synced: false,
            remote_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the user-authored fields are identical.
    pub fn same_content(&self, other: &DiaryEntry) -> bool {
        self.notes == other.notes
            && self.mood == other.mood
            && self.intensity == other.intensity
            && self.date == other.date
    }

    pub fn is_pending(&self) -> bool {
        !self.synced
    }
}

/// User edit to an existing entry. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPatch {
    pub notes: Option<String>,
    pub mood: Option<MoodLabel>,
    pub intensity: Option<u8>,
    pub date: Option<DateTime<Utc>>,
}

impl EntryPatch {
    pub fn notes(notes: impl Into<String>) -> Self {
        EntryPatch {
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.mood.is_none() && self.intensity.is_none() && self.date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Entry notes must not be empty")]
    EmptyNotes,
    #[error("Entry notes are too long: {len} characters, limit is {max}")]
    NotesTooLong { len: usize, max: usize },
    #[error("Unknown mood label: {0:?}")]
    InvalidMood(String),
    #[error("Intensity {0} is out of range, use 0 to 100")]
    IntensityOutOfRange(u8),
}

pub fn validate_notes(notes: &str, max_chars: usize) -> Result<(), ValidationError> {
    if notes.trim().is_empty() {
        return Err(ValidationError::EmptyNotes);
    }
    let len = notes.chars().count();
    if len > max_chars {
        return Err(ValidationError::NotesTooLong {
            len,
            max: max_chars,
        });
    }
    Ok(())
}

pub fn validate_intensity(intensity: u8) -> Result<(), ValidationError> {
    if intensity > MAX_INTENSITY {
        return Err(ValidationError::IntensityOutOfRange(intensity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entries_start_pending() {
        let entry = DiaryEntry::new("hello".into(), MoodLabel::Happy, None);
        assert!(!entry.synced);
        assert!(entry.remote_id.is_none());
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn ids_are_unique() {
        let a = DiaryEntry::new("a".into(), MoodLabel::Neutral, None);
        let b = DiaryEntry::new("a".into(), MoodLabel::Neutral, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn validates_notes() {
        assert_eq!(validate_notes("  \n", 10), Err(ValidationError::EmptyNotes));
        assert_eq!(
            validate_notes("ééééé", 4),
            Err(ValidationError::NotesTooLong { len: 5, max: 4 })
        );
        assert!(validate_notes("fine", 4).is_ok());
    }

    #[test]
    fn validates_intensity() {
        assert!(validate_intensity(0).is_ok());
        assert!(validate_intensity(100).is_ok());
        assert_eq!(validate_intensity(101), Err(ValidationError::IntensityOutOfRange(101)));
    }

    #[test]
    fn intensity_is_part_of_content() {
        let a = DiaryEntry::new("same".into(), MoodLabel::Sad, None);
        let mut b = a.clone();
        assert!(a.same_content(&b));
        b.intensity = 20;
        assert!(!a.same_content(&b));
    }

    #[test]
    fn reads_camel_case_fields() {
        let json = r#"{
            "id": "1",
            "date": "2024-05-01T10:00:00Z",
            "moodLabel": "Sad",
            "notes": "rainy",
            "remoteId": "abc",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }"#;
        let entry: DiaryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.mood, MoodLabel::Sad);
        assert_eq!(entry.remote_id.as_deref(), Some("abc"));
        assert_eq!(entry.intensity, DEFAULT_INTENSITY);
        assert!(!entry.synced);
    }
}
