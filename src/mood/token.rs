use super::lexicon;

/// Upper bound on tokens considered for scoring.
pub const MAX_TOKENS: usize = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Index of the clause the token belongs to. Clauses are split on
    /// sentence punctuation and on contrastive conjunctions.
    pub clause: u32,
}

fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '\u{2019}'
}

fn breaks_clause(c: char) -> bool {
    matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '\n')
}

/// Lowercase word tokens: alphabetic runs, keeping an apostrophe that sits
/// between two letters (`don't`). Everything else separates tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut clause = 0u32;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if tokens.len() >= MAX_TOKENS {
            break;
        }
        if c.is_alphabetic() {
            current.extend(c.to_lowercase());
            continue;
        }
        if is_apostrophe(c)
            && !current.is_empty()
            && chars.peek().is_some_and(|next| next.is_alphabetic())
        {
            current.push('\'');
            continue;
        }
        push_token(&mut tokens, &mut current, &mut clause);
        if breaks_clause(c) {
            clause += 1;
        }
    }
    push_token(&mut tokens, &mut current, &mut clause);
    tokens.truncate(MAX_TOKENS);
    tokens
}

fn push_token(tokens: &mut Vec<Token>, current: &mut String, clause: &mut u32) {
    if current.is_empty() {
        return;
    }
    let text = std::mem::take(current);
    if lexicon::opens_clause(&text) {
        *clause += 1;
    }
    tokens.push(Token {
        text,
        clause: *clause,
    });
}
