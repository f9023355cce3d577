use std::collections::BTreeMap;

use serde::Serialize;

use super::label::MoodLabel;
use super::lexicon::{self, PHRASES};
use super::modulator::{self, BASE_POINTS};
use super::token::tokenize;

/// Bonus added per matched multi-word phrase, in centi-points.
pub const PHRASE_POINTS: u32 = 2 * BASE_POINTS;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodInference {
    pub mood: MoodLabel,
    pub score: f64,
    pub per_mood_scores: BTreeMap<MoodLabel, f64>,
    pub confidence: f64,
}

/// Integer tallies per mood. Kept separate from the float output so that
/// accumulation is exact regardless of platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tally(BTreeMap<MoodLabel, u32>);

impl Tally {
    fn new() -> Self {
        Tally(MoodLabel::ALL.into_iter().map(|m| (m, 0)).collect())
    }

    fn add(&mut self, mood: MoodLabel, points: u32) {
        let slot = self.0.entry(mood).or_insert(0);
        *slot = slot.saturating_add(points);
    }

    fn get(&self, mood: MoodLabel) -> u32 {
        self.0.get(&mood).copied().unwrap_or(0)
    }

    fn total(&self) -> u64 {
        self.0.values().map(|v| u64::from(*v)).sum()
    }

    /// Strictly highest score wins; any tie at the top, or no evidence at all, is Neutral.
    fn winner(&self) -> MoodLabel {
        let best = self.0.values().copied().max().unwrap_or(0);
        if best == 0 {
            return MoodLabel::Neutral;
        }
        let mut leaders = self.0.iter().filter(|(_, v)| **v == best).map(|(m, _)| *m);
        match (leaders.next(), leaders.next()) {
            (Some(only), None) => only,
            _ => MoodLabel::Neutral,
        }
    }
}

fn points_to_score(points: u32) -> f64 {
    f64::from(points) / f64::from(BASE_POINTS)
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || c == '\''
}

/// Occurrences of `phrase` in `haystack` bounded by non-word characters.
fn count_phrase(haystack: &str, phrase: &str) -> u32 {
    haystack
        .match_indices(phrase)
        .filter(|(start, matched)| {
            let end = start + matched.len();
            let before = haystack[..*start].chars().next_back();
            let after = haystack[end..].chars().next();
            !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
        })
        .count() as u32
}

fn score_phrases(text: &str, tally: &mut Tally) {
    let normalized = text.to_lowercase().replace('\u{2019}', "'");
    for (phrase, mood) in PHRASES {
        let hits = count_phrase(&normalized, phrase);
        if hits > 0 {
            tally.add(*mood, hits.saturating_mul(PHRASE_POINTS));
        }
    }
}

fn score_tokens(text: &str, tally: &mut Tally) {
    let tokens = tokenize(text);
    for (index, token) in tokens.iter().enumerate() {
        let Some(mood) = lexicon::classify_token(&token.text) else {
            continue;
        };
        let modulation = modulator::modulate(&tokens, index);
        let c = modulator::contribution(mood, modulation);
        tally.add(c.mood, c.points);
    }
}

/// Infer the mood of a piece of free text.
///
/// Total over all inputs and fully deterministic: no I/O, no randomness and
/// integer accumulation throughout.
pub fn infer(text: &str) -> MoodInference {
    let mut tally = Tally::new();
    if !text.trim().is_empty() {
        score_phrases(text, &mut tally);
        score_tokens(text, &mut tally);
    }

    let mood = tally.winner();
    let winning = tally.get(mood);
    let total = tally.total();
    let confidence = if total == 0 {
        1.0
    } else {
        (winning as f64 / total as f64).clamp(0.0, 1.0)
    };

    MoodInference {
        mood,
        score: points_to_score(winning),
        per_mood_scores: tally
            .0
            .iter()
            .map(|(m, p)| (*m, points_to_score(*p)))
            .collect(),
        confidence,
    }
}
