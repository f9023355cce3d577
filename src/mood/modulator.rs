//! Negation and intensity handling around a classified token.

use super::label::MoodLabel;
use super::lexicon::{self, Modifier};
use super::token::Token;

/// One unit of evidence, in centi-points.
pub const BASE_POINTS: u32 = 100;
pub const STRONG_BOOST: u32 = 100;
pub const LIGHT_BOOST: u32 = 50;
pub const DOWNTONER_CUT: u32 = 50;
/// Minimum contribution of a toned-down word.
pub const FLOOR_POINTS: u32 = 25;
/// Neutral evidence left behind by a negated word whose mood has no opposite.
pub const NEGATED_NEUTRAL_POINTS: u32 = 25;
/// How many non-filler tokens back a negation can reach.
pub const NEGATION_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Plain,
    Negated,
    Modified(Modifier),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub mood: MoodLabel,
    pub points: u32,
}

/// Non-filler tokens before `index`, nearest first, within the same clause.
fn preceding(tokens: &[Token], index: usize) -> impl Iterator<Item = &Token> {
    let clause = tokens[index].clause;
    tokens[..index]
        .iter()
        .rev()
        .take_while(move |t| t.clause == clause)
        .filter(|t| !lexicon::is_filler(&t.text))
}

pub fn modulate(tokens: &[Token], index: usize) -> Modulation {
    let negated = preceding(tokens, index)
        .take(NEGATION_WINDOW)
        .any(|t| lexicon::is_negation(&t.text));
    if negated {
        return Modulation::Negated;
    }

    match preceding(tokens, index)
        .next()
        .and_then(|t| lexicon::modifier(&t.text))
    {
        Some(kind) => Modulation::Modified(kind),
        None => Modulation::Plain,
    }
}

/// Evidence a token mapped to `mood` adds under `modulation`. Always positive.
pub fn contribution(mood: MoodLabel, modulation: Modulation) -> Contribution {
    match modulation {
        Modulation::Plain => Contribution {
            mood,
            points: BASE_POINTS,
        },
        Modulation::Negated => match lexicon::negation_opposite(mood) {
            Some(opposite) => Contribution {
                mood: opposite,
                points: BASE_POINTS,
            },
            None => Contribution {
                mood: MoodLabel::Neutral,
                points: NEGATED_NEUTRAL_POINTS,
            },
        },
        Modulation::Modified(Modifier::Strong) => Contribution {
            mood,
            points: BASE_POINTS + STRONG_BOOST,
        },
        Modulation::Modified(Modifier::Light) => Contribution {
            mood,
            points: BASE_POINTS + LIGHT_BOOST,
        },
        Modulation::Modified(Modifier::Downtoner) => Contribution {
            mood,
            points: BASE_POINTS.saturating_sub(DOWNTONER_CUT).max(FLOOR_POINTS),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::token::tokenize;

    fn modulation_of(text: &str, word: &str) -> Modulation {
        let tokens = tokenize(text);
        let index = tokens.iter().position(|t| t.text == word).unwrap();
        modulate(&tokens, index)
    }

    #[test]
    fn detects_negation_through_fillers() {
        assert_eq!(modulation_of("I am not happy", "happy"), Modulation::Negated);
        assert_eq!(
            modulation_of("I'm not really feeling happy", "happy"),
            Modulation::Negated
        );
    }

    #[test]
    fn negation_window_is_bounded() {
        assert_eq!(
            modulation_of("not one two three happy", "happy"),
            Modulation::Plain
        );
    }

    #[test]
    fn negation_stops_at_clause_boundary() {
        assert_eq!(
            modulation_of("not tired, just worried", "worried"),
            Modulation::Plain
        );
        assert_eq!(
            modulation_of("not tired but happy", "happy"),
            Modulation::Plain
        );
    }

    #[test]
    fn finds_immediate_modifier() {
        assert_eq!(
            modulation_of("I am very happy", "happy"),
            Modulation::Modified(Modifier::Strong)
        );
        assert_eq!(
            modulation_of("a bit worried", "worried"),
            Modulation::Modified(Modifier::Downtoner)
        );
        assert_eq!(modulation_of("very much happy", "happy"), Modulation::Plain);
    }

    #[test]
    fn negated_evidence_is_redirected() {
        let c = contribution(MoodLabel::Happy, Modulation::Negated);
        assert_eq!(c.mood, MoodLabel::Sad);
        assert_eq!(c.points, BASE_POINTS);

        let c = contribution(MoodLabel::Tired, Modulation::Negated);
        assert_eq!(c.mood, MoodLabel::Neutral);
        assert_eq!(c.points, NEGATED_NEUTRAL_POINTS);
    }

    #[test]
    fn downtoner_never_drops_below_floor() {
        let c = contribution(MoodLabel::Sad, Modulation::Modified(Modifier::Downtoner));
        assert!(c.points >= FLOOR_POINTS);
        assert!(c.points < BASE_POINTS);
    }
}
