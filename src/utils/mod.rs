//! Text utilities shared by the extractors and the persistence layer
//!
//! `normalize_text` canonicalizes scraped text so that matching and storage
//! see the same shape regardless of how a site renders quotes or spacing.

use once_cell::sync::Lazy;
use regex::Regex;

/// Typographic quote characters and their ASCII replacements.
const QUOTE_MAP: &[(char, char)] = &[
    ('\u{2018}', '\''), // ‘
    ('\u{2019}', '\''), // ’
    ('\u{201A}', '\''), // ‚
    ('\u{201B}', '\''), // ‛
    ('\u{201C}', '"'),  // “
    ('\u{201D}', '"'),  // ”
    ('\u{201E}', '"'),  // „
    ('\u{201F}', '"'),  // ‟
];

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static whitespace regex"));
static BLANK_LINE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static newline regex"));

/// Normalize scraped text.
///
/// 1. Typographic quotes become ASCII quotes.
/// 2. Whitespace runs inside each line collapse to one space; lines are trimmed.
/// 3. Three or more consecutive newlines become exactly two.
/// 4. The whole result is trimmed.
///
/// The function is idempotent.
///
/// # Examples
/// ```
/// use stockwatch::utils::normalize_text;
///
/// assert_eq!(normalize_text("  \u{201C}BHP\u{201D}   up \n\n\n\n today "), "\"BHP\" up\n\ntoday");
/// ```
pub fn normalize_text(text: &str) -> String {
    let converted: String = text
        .chars()
        .map(|c| {
            QUOTE_MAP
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect();

    let lines: Vec<String> = converted
        .split('\n')
        .map(|line| WHITESPACE_RUN.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");

    BLANK_LINE_RUN
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Normalize each fragment, join them with newlines and normalize the result.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    let parts: Vec<String> = fragments
        .iter()
        .map(|f| normalize_text(f.as_ref()))
        .collect();
    normalize_text(&parts.join("\n"))
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curly_quotes_become_ascii() {
        assert_eq!(
            normalize_text("\u{2018}a\u{2019} \u{201C}b\u{201D} \u{201B}c\u{201F}"),
            "'a' \"b\" 'c\""
        );
    }

    #[test]
    fn test_whitespace_collapses_within_lines() {
        assert_eq!(normalize_text("a \t  b\r\n   c   d  "), "a b\nc d");
    }

    #[test]
    fn test_blank_line_runs_collapse_to_two() {
        assert_eq!(normalize_text("one\n\n\n\n\ntwo\n\nthree"), "one\n\ntwo\n\nthree");
        // lines made only of spaces count as blank once trimmed
        assert_eq!(normalize_text("one\n  \n \t\n\ntwo"), "one\n\ntwo");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\n\n \t "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "",
            "plain",
            "  lead and trail  ",
            "\u{201C}quoted\u{201D}\n\n\n\n\nnext",
            "a\u{00A0}\u{00A0}b\n\u{2003}c",
            "\n\n\nx\r\n\r\n\r\ny\n",
            "tab\tseparated\tvalues\n\n\n",
            "mixed \u{2018}single\u{2019} and\n \n \n \nspaced",
        ];
        for sample in samples {
            let once = normalize_text(sample);
            assert_eq!(normalize_text(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_join_fragments_normalizes_each_then_all() {
        let parts = ["  first  para ", "", "", "second\u{2019}s"];
        assert_eq!(join_fragments(&parts), "first para\n\nsecond's");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("ação", 2), "aç");
        assert_eq!(truncate_chars("", 0), "");
    }
}
