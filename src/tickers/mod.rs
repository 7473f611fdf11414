//! Watch-list handling: loading the external symbol list, diffing it against
//! persisted tickers, and matching text against the compiled watch-list.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::db::{Ticker, TICKER_SYMBOL_MAX};
use crate::utils::truncate_chars;

/// Read watch-list symbols from a header-less CSV (symbol in the first column).
///
/// Blank cells are skipped and repeated symbols keep their first position.
pub fn load_symbols(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open watch-list {}", path.display()))?;
    read_symbols(file).with_context(|| format!("Failed to parse watch-list {}", path.display()))
}

pub fn read_symbols<R: std::io::Read>(input: R) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut seen = HashSet::new();
    let mut symbols = Vec::new();
    for result in reader.records() {
        let record = result?;
        let Some(symbol) = record.get(0) else {
            continue;
        };
        if symbol.is_empty() {
            continue;
        }
        if seen.insert(symbol.to_string()) {
            symbols.push(symbol.to_string());
        }
    }
    Ok(symbols)
}

/// Symbols from `input` that are not yet persisted, in input order.
///
/// Symbols are compared in their stored form (cut to [`TICKER_SYMBOL_MAX`]
/// characters), so an over-long symbol is only ever added once.
pub fn diff_new_symbols(input: &[String], persisted: &[Ticker]) -> Vec<String> {
    let mut known: HashSet<&str> = persisted
        .iter()
        .map(|t| truncate_chars(&t.symbol, TICKER_SYMBOL_MAX))
        .collect();
    let mut additions = Vec::new();
    for symbol in input {
        if known.insert(truncate_chars(symbol, TICKER_SYMBOL_MAX)) {
            additions.push(symbol.clone());
        }
    }
    additions
}

/// Ordered watch-list with one compiled whole-word pattern per ticker.
///
/// A symbol matches when it is neither preceded nor followed by an
/// alphanumeric or underscore character. Symbols are compared as written.
#[derive(Debug, Clone)]
pub struct Watchlist {
    entries: Vec<(Ticker, Option<Regex>)>,
}

impl Watchlist {
    pub fn new(tickers: Vec<Ticker>) -> Self {
        let entries = tickers
            .into_iter()
            .map(|ticker| {
                let pattern = symbol_pattern(&ticker.symbol);
                if pattern.is_none() && !ticker.symbol.is_empty() {
                    tracing::warn!("Ticker {} could not be compiled, it will never match", ticker.symbol);
                }
                (ticker, pattern)
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.entries.iter().map(|(t, _)| t)
    }

    /// First ticker, in list order, mentioned in `title + " " + body`.
    pub fn find(&self, title: &str, body: &str) -> Option<&Ticker> {
        let text = format!("{} {}", title, body);
        self.entries
            .iter()
            .find(|(_, pattern)| pattern.as_ref().is_some_and(|re| re.is_match(&text)))
            .map(|(ticker, _)| ticker)
    }
}

// Letters, digits and underscore only; combining marks and other connector
// punctuation count as boundaries.
const NON_WORD: &str = r"[^\p{Alphabetic}\p{N}_]";

fn symbol_pattern(symbol: &str) -> Option<Regex> {
    if symbol.is_empty() {
        return None;
    }
    Regex::new(&format!(
        r"(?:^|{}){}(?:{}|$)",
        NON_WORD,
        regex::escape(symbol),
        NON_WORD
    ))
    .ok()
}
