//! Best-effort "is this code unfinished" detection.
//!
//! Non-semantic: regex and bracket counting over a few lines. The result
//! only picks the hybrid fallback strategy; it never rejects input.

use std::sync::LazyLock;

use regex::Regex;

/// Lines inspected after the cursor line.
pub const LOOKAHEAD_LINES: usize = 3;

/// `const x`, `let total`, `var y` with nothing after the name.
static INCOMPLETE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*$")
        .expect("static declaration regex")
});

/// `function name(args)` with no body opened on the line.
static BARE_FUNCTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\b[^{]*$").expect("static function regex")
});

/// Line starting a call or a function-like construct.
static OPENS_CONSTRUCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[A-Za-z_$][\w$.]*\s*\(|(?:async\s+)?function\b|(?:const|let|var)\s+[\w$]+\s*=\s*(?:async\s*)?(?:\(|function\b|[\w$]+\s*=>))",
    )
    .expect("static construct regex")
});

/// Net `(paren, brace)` depth over `text`, skipping strings and line comments.
pub fn bracket_balance(text: &str) -> (i64, i64)
{
    let mut parens = 0i64;
    let mut braces = 0i64;

    for line in text.lines()
    {
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut prev = '\0';

        for ch in line.chars()
        {
            if let Some(q) = quote
            {
                if escaped
                {
                    escaped = false;
                }
                else if ch == '\\'
                {
                    escaped = true;
                }
                else if ch == q
                {
                    quote = None;
                }
                prev = ch;
                continue;
            }

            match ch
            {
                '"' | '\'' | '`' => quote = Some(ch),
                '/' if prev == '/' => break,
                '(' => parens += 1,
                ')' => parens -= 1,
                '{' => braces += 1,
                '}' => braces -= 1,
                _ =>
                {}
            }
            prev = ch;
        }
    }

    (parens, braces)
}

/// Whether the code at the cursor looks mid-edit.
///
/// `window[0]` is the cursor line, followed by up to [`LOOKAHEAD_LINES`]
/// lines. `tree_has_error` gates the bracket checks so that complete code
/// with long multi-line constructs is not misreported.
pub fn looks_unfinished(
    window: &[&str],
    tree_has_error: bool,
) -> bool
{
    let Some(cursor_line) = window.first()
    else
    {
        return false;
    };

    if INCOMPLETE_DECL.is_match(cursor_line) || BARE_FUNCTION_HEADER.is_match(cursor_line)
    {
        return true;
    }

    if !tree_has_error
    {
        return false;
    }

    let span = window
        .iter()
        .take(LOOKAHEAD_LINES + 1)
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    let (parens, braces) = bracket_balance(&span);
    if parens > 0 || braces > 0
    {
        return true;
    }

    // A construct opened here with no closer anywhere nearby
    OPENS_CONSTRUCT.is_match(cursor_line)
        && !window
            .iter()
            .skip(1)
            .take(LOOKAHEAD_LINES)
            .any(|l| l.contains(')') || l.contains('}'))
}
