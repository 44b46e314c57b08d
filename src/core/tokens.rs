//! Token and similarity utilities.
//!
//! Pure functions only: split source text into lowercase word tokens on
//! case and punctuation boundaries, drop stopwords, deduplicate, and
//! compare token sets with Jaccard similarity.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

/// Alphanumeric runs; underscores and `$` act as separators.
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").expect("static word regex"));

/// Words carrying no signal for relevance: JS keywords, common builtins
/// and English filler typical of test titles.
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // language keywords
        "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "export", "extends", "false", "finally", "for",
        "function", "if", "import", "in", "instanceof", "let", "new", "null", "of", "return",
        "super", "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void",
        "while", "with", "yield",
        // english filler
        "a", "an", "and", "are", "as", "at", "be", "by", "is", "it", "its", "not", "on", "or",
        "should", "that", "the", "to", "was", "when", "which", "will",
    ]
    .into_iter()
    .collect()
});

/// True when `word` (already lowercase) is a stopword.
pub fn is_stopword(word: &str) -> bool
{
    STOPWORDS.contains(word)
}

/// Split an identifier-like word on case boundaries.
///
/// `getUserName` → `get`, `User`, `Name`; `HTTPResponse` → `HTTP`, `Response`;
/// `parse2Json` → `parse2`, `Json`.
pub fn split_case(word: &str) -> Vec<&str>
{
    let chars: Vec<(usize, char)> = word
        .char_indices()
        .collect();
    let mut parts = Vec::new();
    let mut start = 0usize;

    for i in 1..chars.len()
    {
        let (at, ch) = chars[i];
        let prev = chars[i - 1].1;
        let next = chars
            .get(i + 1)
            .map(|(_, c)| *c);

        // lower→Upper, or the last capital of an acronym followed by lower
        let boundary = ((prev.is_lowercase() || prev.is_ascii_digit()) && ch.is_uppercase())
            || (prev.is_uppercase()
                && ch.is_uppercase()
                && next.is_some_and(|n| n.is_lowercase()));

        if boundary
        {
            parts.push(&word[start..at]);
            start = at;
        }
    }

    if start < word.len()
    {
        parts.push(&word[start..]);
    }

    parts
}

/// Tokenize text into lowercase case-split words, stopwords removed,
/// first occurrence order preserved, duplicates dropped.
pub fn tokenize(text: &str) -> Vec<String>
{
    let mut seen: IndexSet<String> = IndexSet::new();

    for m in WORD_RE.find_iter(text)
    {
        for part in split_case(m.as_str())
        {
            let lower = part.to_lowercase();

            // Single characters and pure numbers are noise
            if lower.len() < 2
                || lower
                    .bytes()
                    .all(|b| b.is_ascii_digit())
                || is_stopword(&lower)
            {
                continue;
            }

            seen.insert(lower);
        }
    }

    seen.into_iter()
        .collect()
}

/// Tokenize straight into a set.
pub fn token_set(text: &str) -> HashSet<String>
{
    tokenize(text)
        .into_iter()
        .collect()
}

/// |A ∩ B| / |A ∪ B|; two empty sets score 0.
pub fn jaccard(
    a: &HashSet<String>,
    b: &HashSet<String>,
) -> f64
{
    let union = a
        .union(b)
        .count();
    if union == 0
    {
        return 0.0;
    }

    let inter = a
        .intersection(b)
        .count();

    inter as f64 / union as f64
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub fn clamp01(x: f64) -> f64
{
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn splits_camel_pascal_and_acronyms()
    {
        assert_eq!(split_case("getUserName"), vec!["get", "User", "Name"]);
        assert_eq!(split_case("HTTPResponse"), vec!["HTTP", "Response"]);
        assert_eq!(split_case("parse2Json"), vec!["parse2", "Json"]);
        assert_eq!(split_case("x"), vec!["x"]);
    }

    #[test]
    fn tokenize_lowercases_filters_and_dedupes()
    {
        let toks = tokenize("const userName = getUser_name(user); // the USER");
        assert_eq!(toks, vec!["user", "name", "get"]);
    }

    #[test]
    fn tokenize_drops_numbers_and_single_chars()
    {
        assert!(tokenize("a 1 22 b").is_empty());
    }

    #[test]
    fn jaccard_bounds()
    {
        let a = token_set("sum prices total");
        let b = token_set("sum weights total");
        let empty = HashSet::new();

        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-9);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }

    #[test]
    fn clamp01_handles_nan()
    {
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(3.0), 1.0);
        assert_eq!(clamp01(-1.0), 0.0);
    }
}
