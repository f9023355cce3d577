use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::entry::DiaryEntry;
use crate::mood::MoodLabel;

/// Mood distribution over a set of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodSummary {
    pub counts: BTreeMap<MoodLabel, usize>,
    pub total: usize,
    /// Entries not yet confirmed by the remote, regardless of window.
    pub pending: usize,
    pub dominant: MoodLabel,
    /// Rounded mean intensity of counted entries, `None` when there are none.
    pub average_intensity: Option<u8>,
}

impl MoodSummary {
    /// Count moods of entries dated within `window` of `now` (all entries
    /// when `window` is `None`).
    pub fn from_entries(entries: &[DiaryEntry], window: Option<Duration>, now: DateTime<Utc>) -> Self {
        let cutoff = window.map(|w| now - w);
        let mut counts: BTreeMap<MoodLabel, usize> = MoodLabel::ALL.into_iter().map(|m| (m, 0)).collect();
        let mut total = 0;
        let mut intensity_sum = 0u32;

        for entry in entries {
            if cutoff.is_some_and(|c| entry.date < c) {
                continue;
            }
            *counts.entry(entry.mood).or_insert(0) += 1;
            total += 1;
            intensity_sum += u32::from(entry.intensity);
        }
        let average_intensity = u32::try_from(total)
            .ok()
            .filter(|n| *n > 0)
            .and_then(|n| u8::try_from((intensity_sum + n / 2) / n).ok());

        let best = counts.values().copied().max().unwrap_or(0);
        let leaders: Vec<MoodLabel> = counts
            .iter()
            .filter(|(_, c)| **c == best)
            .map(|(m, _)| *m)
            .collect();
        let dominant = match leaders.as_slice() {
            [only] if best > 0 => *only,
            _ => MoodLabel::Neutral,
        };

        MoodSummary {
            counts,
            total,
            pending: entries.iter().filter(|e| e.is_pending()).count(),
            dominant,
            average_intensity,
        }
    }

    /// Share of `mood` among counted entries, 0 when there are none.
    pub fn share(&self, mood: MoodLabel) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.counts.get(&mood).copied().unwrap_or(0) as f64 / self.total as f64
    }
}
