use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entry::ValidationError;

/// Closed set of moods an entry can carry.
///
/// The declaration order is the canonical order used for score maps and
/// listings, so it must never depend on dictionary iteration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MoodLabel {
    Happy,
    Sad,
    #[default]
    Neutral,
    Anxious,
    Excited,
    Tired,
}

impl MoodLabel {
    pub const ALL: [MoodLabel; 6] = [
        MoodLabel::Happy,
        MoodLabel::Sad,
        MoodLabel::Neutral,
        MoodLabel::Anxious,
        MoodLabel::Excited,
        MoodLabel::Tired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Happy => "Happy",
            MoodLabel::Sad => "Sad",
            MoodLabel::Neutral => "Neutral",
            MoodLabel::Anxious => "Anxious",
            MoodLabel::Excited => "Excited",
            MoodLabel::Tired => "Tired",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MoodLabel::Happy => "😊",
            MoodLabel::Sad => "😞",
            MoodLabel::Neutral => "😐",
            MoodLabel::Anxious => "😰",
            MoodLabel::Excited => "🤩",
            MoodLabel::Tired => "😴",
        }
    }

    /// Label prefixed with its emoji, e.g. `😊 Happy`.
    pub fn with_emoji(&self) -> String {
        format!("{} {}", self.emoji(), self.as_str())
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodLabel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MoodLabel::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::InvalidMood(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("happy".parse::<MoodLabel>().unwrap(), MoodLabel::Happy);
        assert_eq!(" TIRED ".parse::<MoodLabel>().unwrap(), MoodLabel::Tired);
    }

    #[test]
    fn rejects_unknown_label() {
        let err = "grumpy".parse::<MoodLabel>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMood(ref s) if s == "grumpy"));
    }

    #[test]
    fn serializes_as_plain_name() {
        let json = serde_json::to_string(&MoodLabel::Anxious).unwrap();
        assert_eq!(json, "\"Anxious\"");
    }
}
