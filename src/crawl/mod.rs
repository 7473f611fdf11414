//! Incremental crawl control.
//!
//! Listings are walked newest first and the walk stops at the first candidate
//! whose URL was persisted by an earlier run.
//!
//! # Precondition
//!
//! Every listing handed to [`scan`] must be ordered newest first, and the
//! [`SeenSet`] must contain every URL persisted so far. Both are required for
//! the stop-on-seen rule to be correct: an out-of-order listing either stops
//! too early (new items after an old one are never examined) or examines items
//! that were already stored.

use anyhow::Result;
use reqwest::Url;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::db::{Extraction, SourceKind, POST_URL_MAX};
use crate::error::ExtractError;
use crate::scraping::Record;
use crate::tickers::Watchlist;
use crate::utils::truncate_chars;

/// URLs already persisted before the run started. Not refreshed mid-run.
///
/// URLs are keyed by their stored form (cut to [`POST_URL_MAX`] characters),
/// so a long candidate URL still matches the truncated copy in the database.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    urls: HashSet<String>,
}

impl SeenSet {
    pub fn insert(&mut self, url: impl Into<String>) {
        let url = url.into();
        let key = truncate_chars(&url, POST_URL_MAX).to_string();
        self.urls.insert(key);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(truncate_chars(url, POST_URL_MAX))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut seen = SeenSet::default();
        for url in iter {
            seen.insert(url);
        }
        seen
    }
}

/// One listing entry considered for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Canonical absolute URL, compared against the seen set
    pub url: String,
    /// Fields scraped from the listing itself (may be empty)
    pub row: Record,
}

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            row: Record::default(),
        }
    }

    pub fn with_row(url: impl Into<String>, row: Record) -> Self {
        Self {
            url: url.into(),
            row,
        }
    }
}

/// Resolve a listing href against the site root.
pub fn canonical_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

/// A content origin with its own listing and document shape.
pub trait Source {
    fn kind(&self) -> SourceKind;

    /// Listing entries, newest first.
    fn candidates(&self) -> Result<Vec<Candidate>>;

    /// `Ok(None)` when the candidate mentions no watch-listed ticker.
    fn extract(
        &self,
        candidate: &Candidate,
        watchlist: &Watchlist,
    ) -> Result<Option<Extraction>, ExtractError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Candidates handed to the extractor
    pub examined: usize,
    pub extracted: usize,
    /// No ticker mention
    pub skipped: usize,
    pub failed: usize,
    /// URL of the already-seen candidate that ended the scan
    pub stopped_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub extractions: Vec<Extraction>,
    pub stats: ScanStats,
}

/// Walk `candidates` in order until one is already in `seen`.
///
/// Extraction failures are logged and skipped; they never stop the scan.
pub fn scan<I, F>(candidates: I, seen: &SeenSet, mut extract: F) -> ScanOutcome
where
    I: IntoIterator<Item = Candidate>,
    F: FnMut(&Candidate) -> Result<Option<Extraction>, ExtractError>,
{
    let mut outcome = ScanOutcome::default();

    for candidate in candidates {
        if seen.contains(&candidate.url) {
            info!("Reached previously stored post, stopping: {}", candidate.url);
            outcome.stats.stopped_at = Some(candidate.url);
            break;
        }

        outcome.stats.examined += 1;
        match extract(&candidate) {
            Ok(Some(extraction)) => {
                debug!(
                    "Matched {} in {}",
                    extraction.post.ticker_symbol, extraction.post.url
                );
                outcome.stats.extracted += 1;
                outcome.extractions.push(extraction);
            }
            Ok(None) => {
                outcome.stats.skipped += 1;
            }
            Err(err) => {
                warn!("Skipping {}: {}", candidate.url, err);
                outcome.stats.failed += 1;
            }
        }
    }

    outcome
}

/// Enumerate a source and scan it against `seen`.
pub fn scan_source(
    source: &dyn Source,
    watchlist: &Watchlist,
    seen: &SeenSet,
) -> Result<ScanOutcome> {
    let candidates = source.candidates()?;
    info!(
        "{}: {} candidate(s) on listing",
        source.kind(),
        candidates.len()
    );
    Ok(scan(candidates, seen, |candidate| {
        source.extract(candidate, watchlist)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ExtractedPost, SourceKind};
    use std::cell::RefCell;

    fn extraction_for(url: &str) -> Extraction {
        Extraction {
            post: ExtractedPost {
                source: SourceKind::Reddit,
                url: url.to_string(),
                external_id: String::new(),
                title: String::new(),
                description: String::new(),
                ticker_id: 1,
                ticker_symbol: "BHP".to_string(),
            },
            comments: Vec::new(),
        }
    }

    fn candidates(urls: &[&str]) -> Vec<Candidate> {
        urls.iter().map(|u| Candidate::new(*u)).collect()
    }

    #[test]
    fn test_stops_before_first_seen_candidate() {
        let seen: SeenSet = ["c3"].into_iter().collect();
        let visited = RefCell::new(Vec::new());

        let outcome = scan(candidates(&["c1", "c2", "c3", "c4"]), &seen, |c| {
            visited.borrow_mut().push(c.url.clone());
            Ok(Some(extraction_for(&c.url)))
        });

        assert_eq!(*visited.borrow(), vec!["c1", "c2"]);
        let urls: Vec<_> = outcome.extractions.iter().map(|e| e.post.url.as_str()).collect();
        assert_eq!(urls, vec!["c1", "c2"]);
        assert_eq!(outcome.stats.stopped_at.as_deref(), Some("c3"));
    }

    #[test]
    fn test_unmatched_and_failed_candidates_do_not_stop_scan() {
        let seen = SeenSet::default();
        let outcome = scan(candidates(&["a", "b", "c", "d"]), &seen, |c| match c.url.as_str() {
            "a" => Ok(None),
            "b" => Err(ExtractError::Fetch("timeout".into())),
            _ => Ok(Some(extraction_for(&c.url))),
        });

        let urls: Vec<_> = outcome.extractions.iter().map(|e| e.post.url.as_str()).collect();
        assert_eq!(urls, vec!["c", "d"]);
        assert_eq!(
            outcome.stats,
            ScanStats {
                examined: 4,
                extracted: 2,
                skipped: 1,
                failed: 1,
                stopped_at: None,
            }
        );
    }

    #[test]
    fn test_candidates_are_consumed_lazily() {
        let seen: SeenSet = ["old"].into_iter().collect();
        let produced = RefCell::new(0usize);
        let listing = ["new1", "old", "older", "oldest"].into_iter().map(|u| {
            *produced.borrow_mut() += 1;
            Candidate::new(u)
        });

        let outcome = scan(listing, &seen, |c| Ok(Some(extraction_for(&c.url))));
        assert_eq!(outcome.extractions.len(), 1);
        assert_eq!(*produced.borrow(), 2);
    }

    #[test]
    fn test_out_of_order_listing_under_scans() {
        // "fresh" is newer than "stored" but listed after it, so it is never reached
        let seen: SeenSet = ["stored"].into_iter().collect();
        let outcome = scan(candidates(&["new", "stored", "fresh"]), &seen, |c| {
            Ok(Some(extraction_for(&c.url)))
        });
        let urls: Vec<_> = outcome.extractions.iter().map(|e| e.post.url.as_str()).collect();
        assert_eq!(urls, vec!["new"]);
        assert!(!urls.contains(&"fresh"));
    }

    #[test]
    fn test_out_of_order_listing_over_scans() {
        // stored items listed ahead of the seen marker get extracted again
        let seen: SeenSet = ["marker"].into_iter().collect();
        let outcome = scan(candidates(&["already-stored", "marker"]), &seen, |c| {
            Ok(Some(extraction_for(&c.url)))
        });
        assert_eq!(outcome.extractions.len(), 1);
        assert_eq!(outcome.extractions[0].post.url, "already-stored");
    }

    #[test]
    fn test_long_url_matches_its_stored_prefix() {
        let long_url = format!("https://hotcopper.com.au/threads/x.1/?post_id=1&{}", "q".repeat(300));
        let stored = truncate_chars(&long_url, POST_URL_MAX).to_string();
        let seen: SeenSet = [stored].into_iter().collect();
        assert!(seen.contains(&long_url));

        let outcome = scan(candidates(&["fresh", long_url.as_str(), "older"]), &seen, |c| {
            Ok(Some(extraction_for(&c.url)))
        });
        assert_eq!(outcome.extractions.len(), 1);
        assert_eq!(outcome.stats.stopped_at.as_deref(), Some(long_url.as_str()));
    }

    #[test]
    fn test_empty_seen_set_scans_everything() {
        let outcome = scan(candidates(&["a", "b"]), &SeenSet::default(), |c| {
            Ok(Some(extraction_for(&c.url)))
        });
        assert_eq!(outcome.extractions.len(), 2);
        assert!(outcome.stats.stopped_at.is_none());
    }

    #[test]
    fn test_canonical_url_joins_relative_hrefs() {
        assert_eq!(
            canonical_url("https://www.reddit.com", "/r/ausstocks/comments/1abc/title/").as_deref(),
            Some("https://www.reddit.com/r/ausstocks/comments/1abc/title/")
        );
        assert_eq!(
            canonical_url("https://hotcopper.com.au", "https://hotcopper.com.au/threads/x/?post_id=9")
                .as_deref(),
            Some("https://hotcopper.com.au/threads/x/?post_id=9")
        );
        assert_eq!(canonical_url("https://hotcopper.com.au", "  "), None);
    }
}
