//! Static dictionaries behind the mood classifier.
//!
//! Every table is immutable and built once on first use. Lookups are keyed
//! by exact lowercase token, so iteration order never affects a result.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use super::label::MoodLabel;

const MOOD_WORDS: &[(MoodLabel, &[&str])] = &[
    (
        MoodLabel::Happy,
        &[
            "happy", "happier", "happiest", "joy", "joyful", "great", "good", "love", "loved",
            "lovely", "grateful", "thankful", "content", "calm", "peace", "peaceful", "smile",
            "smiled", "smiling", "ok", "okay", "fine", "glad", "cheerful", "wonderful", "awesome",
            "relaxed", "delighted", "blessed", "proud", "hopeful",
        ],
    ),
    (
        MoodLabel::Sad,
        &[
            "sad", "sadder", "down", "blue", "unhappy", "depressed", "cry", "cried", "crying",
            "lonely", "miserable", "bad", "upset", "hurt", "heartbroken", "gloomy", "awful",
            "hopeless", "empty", "grief", "disappointed",
        ],
    ),
    (
        MoodLabel::Anxious,
        &[
            "anxious", "anxiety", "worried", "worry", "worrying", "nervous", "panic", "panicked",
            "stressed", "stress", "stressful", "overwhelmed", "fear", "afraid", "scared", "tense",
            "uneasy", "restless", "dread", "frightened",
        ],
    ),
    (
        MoodLabel::Excited,
        &[
            "excited", "exciting", "thrilled", "eager", "pumped", "stoked", "hyped", "ecstatic",
            "energized", "energetic", "enthusiastic", "motivated", "psyched",
        ],
    ),
    (
        MoodLabel::Tired,
        &[
            "tired", "sleepy", "exhausted", "fatigued", "drained", "weary", "sluggish", "drowsy",
            "knackered", "burnout", "lethargic",
        ],
    ),
];

/// Multi-word expressions matched on the lowercased text, independent of tokenization.
pub const PHRASES: &[(&str, MoodLabel)] = &[
    ("over the moon", MoodLabel::Happy),
    ("on cloud nine", MoodLabel::Happy),
    ("on top of the world", MoodLabel::Happy),
    ("at peace", MoodLabel::Happy),
    ("down in the dumps", MoodLabel::Sad),
    ("fed up", MoodLabel::Sad),
    ("broke my heart", MoodLabel::Sad),
    ("on edge", MoodLabel::Anxious),
    ("stressed out", MoodLabel::Anxious),
    ("freaking out", MoodLabel::Anxious),
    ("can't wait", MoodLabel::Excited),
    ("looking forward", MoodLabel::Excited),
    ("fired up", MoodLabel::Excited),
    ("burnt out", MoodLabel::Tired),
    ("burned out", MoodLabel::Tired),
    ("worn out", MoodLabel::Tired),
    ("run down", MoodLabel::Tired),
    ("out of energy", MoodLabel::Tired),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nor", "neither", "without", "hardly", "don't", "dont", "doesn't",
    "didn't", "isn't", "wasn't", "aren't", "weren't", "won't", "can't", "cannot", "couldn't",
    "shouldn't", "wouldn't", "ain't", "haven't", "hasn't",
];

/// Tokens skipped when looking back for a negation or modifier.
const FILLERS: &[&str] = &[
    "a", "an", "the", "i", "i'm", "im", "i've", "me", "my", "am", "is", "are", "was", "were",
    "be", "been", "being", "feel", "feels", "feeling", "felt", "it", "it's", "this", "that",
    "just", "of", "get", "got", "getting", "still", "all", "as", "today", "now",
];

/// Tokens that open a new clause; negation never reaches across them.
const CLAUSE_OPENERS: &[&str] = &["but", "however", "although", "though", "yet"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Strong,
    Light,
    Downtoner,
}

const MODIFIERS: &[(Modifier, &[&str])] = &[
    (
        Modifier::Strong,
        &[
            "very", "really", "so", "extremely", "incredibly", "super", "totally", "completely",
            "absolutely", "utterly", "deeply", "truly", "terribly", "awfully", "insanely",
        ],
    ),
    (Modifier::Light, &["quite", "pretty", "fairly", "rather", "too", "more"]),
    (
        Modifier::Downtoner,
        &[
            "bit", "slightly", "somewhat", "little", "mildly", "kinda", "sorta", "kind", "sort",
            "barely", "less",
        ],
    ),
];

static WORD_INDEX: Lazy<HashMap<&'static str, MoodLabel>> = Lazy::new(|| {
    MOOD_WORDS
        .iter()
        .flat_map(|(mood, words)| words.iter().map(move |w| (*w, *mood)))
        .collect()
});

static MODIFIER_INDEX: Lazy<HashMap<&'static str, Modifier>> = Lazy::new(|| {
    MODIFIERS
        .iter()
        .flat_map(|(kind, words)| words.iter().map(move |w| (*w, *kind)))
        .collect()
});

static NEGATION_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| NEGATIONS.iter().copied().collect());

static FILLER_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| FILLERS.iter().copied().collect());

pub fn classify_token(token: &str) -> Option<MoodLabel> {
    WORD_INDEX.get(token).copied()
}

pub fn modifier(token: &str) -> Option<Modifier> {
    MODIFIER_INDEX.get(token).copied()
}

pub fn is_negation(token: &str) -> bool {
    NEGATION_SET.contains(token)
}

pub fn is_filler(token: &str) -> bool {
    FILLER_SET.contains(token)
}

pub fn opens_clause(token: &str) -> bool {
    CLAUSE_OPENERS.contains(&token)
}

/// Mood that negated evidence is redirected to, if any.
pub fn negation_opposite(mood: MoodLabel) -> Option<MoodLabel> {
    match mood {
        MoodLabel::Happy => Some(MoodLabel::Sad),
        MoodLabel::Sad => Some(MoodLabel::Happy),
        MoodLabel::Anxious => Some(MoodLabel::Happy),
        MoodLabel::Excited | MoodLabel::Tired | MoodLabel::Neutral => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_word_maps_to_exactly_one_mood() {
        let total: usize = MOOD_WORDS.iter().map(|(_, words)| words.len()).sum();
        assert_eq!(WORD_INDEX.len(), total, "a word is listed under two moods");
    }

    #[test]
    fn word_classes_do_not_overlap() {
        for word in NEGATIONS.iter().chain(FILLERS) {
            assert!(classify_token(word).is_none(), "{word} is also a mood word");
            assert!(modifier(word).is_none(), "{word} is also a modifier");
        }
        for word in FILLERS {
            assert!(!is_negation(word), "{word} is both filler and negation");
        }
    }

    #[test]
    fn neutral_has_no_words() {
        assert!(WORD_INDEX.values().all(|m| *m != MoodLabel::Neutral));
    }

    #[test]
    fn phrases_are_lowercase() {
        for (phrase, _) in PHRASES {
            assert_eq!(*phrase, phrase.to_lowercase());
        }
    }

    #[test]
    fn looks_up_known_tokens() {
        assert_eq!(classify_token("worried"), Some(MoodLabel::Anxious));
        assert_eq!(classify_token("table"), None);
        assert_eq!(modifier("very"), Some(Modifier::Strong));
        assert_eq!(modifier("bit"), Some(Modifier::Downtoner));
        assert!(is_negation("don't"));
        assert!(is_filler("am"));
    }
}
