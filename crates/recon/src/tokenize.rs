//! Ingredient-name decomposition.
//!
//! Two names denote the same ingredient iff their sorted token sequences are
//! equal, so everything that distinguishes a name has to survive here and
//! everything that doesn't has to be dropped.

use std::sync::LazyLock;

use regex::Regex;

/// Tokens that match too much of the alias vocabulary to be distinguishing.
pub const IGNORED_TOKENS: [&str; 4] = ["no.", "carmine", "indigo", "nf"];

/// A sorted token sequence; the unit of ingredient identity.
pub type TokenKey = Vec<String>;

/// Word run, optionally `&`-joined, optionally dot-terminated (`fd&c`, `no.`).
static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+&*\w*\.*").unwrap());
/// Single-level parenthetical, non-greedy up to the first `)`.
static RE_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Split an ingredient name into lowercase word tokens.
///
/// With `remove_parentheses`, parenthesized content is stripped first; a name
/// without both `(` and `)` yields no tokens at all, meaning "no
/// parenthetical variant exists".
pub fn decompose(text: &str, remove_parentheses: bool) -> Vec<String> {
    let lowered = text.to_lowercase();

    let stripped = if remove_parentheses {
        if !(lowered.contains('(') && lowered.contains(')')) {
            return Vec::new();
        }
        RE_PAREN.replace_all(&lowered, "").into_owned()
    } else {
        lowered
    };

    RE_WORD
        .find_iter(&stripped)
        .map(|m| m.as_str())
        .filter(|t| !IGNORED_TOKENS.contains(t))
        .map(str::to_string)
        .collect()
}

/// `decompose` followed by a sort, ready for equality comparison.
pub fn token_key(text: &str, remove_parentheses: bool) -> TokenKey {
    let mut tokens = decompose(text, remove_parentheses);
    tokens.sort();
    tokens
}
