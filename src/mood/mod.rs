//! On-device mood classification.
//!
//! Text is tokenized, each dictionary hit is adjusted for nearby negation or
//! intensity words, phrase bonuses are added, and the per-mood totals pick a
//! winner. See [`infer`].

mod engine;
mod label;
pub mod lexicon;
mod modulator;
mod token;

pub use engine::{infer, MoodInference, PHRASE_POINTS};
pub use label::MoodLabel;
pub use modulator::{contribution, modulate, Contribution, Modulation};
pub use token::{tokenize, Token, MAX_TOKENS};
