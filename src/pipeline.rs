//! Run orchestration
//!
//! One run: add new watch-list symbols, load the full ticker list and the seen
//! set, then scan each source in turn and persist what it found. Sources run
//! sequentially and a failing source does not stop the others.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::crawl::{scan_source, ScanStats, SeenSet, Source};
use crate::db::{Extraction, SourceKind, Store};
use crate::tickers::{diff_new_symbols, Watchlist};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    pub posts_saved: usize,
    pub posts_failed: usize,
    pub comments_saved: usize,
    pub comments_failed: usize,
    /// Comments not submitted because their post failed to save
    pub comments_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub ok: bool,
    pub error: Option<String>,
    pub examined: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub stopped_at: Option<String>,
    pub persist: PersistStats,
}

impl SourceReport {
    fn completed(source: SourceKind, scan: ScanStats, persist: PersistStats) -> Self {
        Self {
            source,
            ok: true,
            error: None,
            examined: scan.examined,
            extracted: scan.extracted,
            skipped: scan.skipped,
            failed: scan.failed,
            stopped_at: scan.stopped_at,
            persist,
        }
    }

    fn failed(source: SourceKind, err: &anyhow::Error) -> Self {
        Self {
            source,
            ok: false,
            error: Some(format!("{:#}", err)),
            examined: 0,
            extracted: 0,
            skipped: 0,
            failed: 0,
            stopped_at: None,
            persist: PersistStats::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub new_tickers: Vec<String>,
    pub watchlist_size: usize,
    pub seen_urls: usize,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    /// True when every source finished its scan
    pub fn success(&self) -> bool {
        self.sources.iter().all(|s| s.ok)
    }
}

/// Insert watch-list symbols that are not persisted yet. Returns the additions.
pub fn sync_watchlist(store: &dyn Store, input: &[String]) -> Result<Vec<String>> {
    let persisted = store.load_tickers().context("Failed to load tickers")?;
    let additions = diff_new_symbols(input, &persisted);
    if additions.is_empty() {
        info!("Watch-list is up to date ({} tickers)", persisted.len());
        return Ok(additions);
    }
    store
        .save_tickers(&additions)
        .context("Failed to save new tickers")?;
    info!("Added {} new ticker(s) to the watch-list", additions.len());
    Ok(additions)
}

/// Save each post, then its comments under the new post id.
///
/// A post that fails to save is logged and its comments are not submitted.
pub fn persist(store: &dyn Store, extractions: &[Extraction]) -> PersistStats {
    let mut stats = PersistStats::default();

    for extraction in extractions {
        let post = &extraction.post;
        let post_id = match store.save_post(post) {
            Ok(id) => id,
            Err(err) => {
                warn!("Failed to save post {}: {:#}", post.url, err);
                stats.posts_failed += 1;
                stats.comments_skipped += extraction.comments.len();
                continue;
            }
        };
        stats.posts_saved += 1;
        info!(
            "Saved post {} ({}) {}",
            post_id, post.ticker_symbol, post.url
        );

        for comment in &extraction.comments {
            match store.save_comment(comment, post_id) {
                Ok(_) => stats.comments_saved += 1,
                Err(err) => {
                    warn!("Failed to save comment on post {}: {:#}", post_id, err);
                    stats.comments_failed += 1;
                }
            }
        }
    }

    stats
}

pub struct Orchestrator<'a> {
    store: &'a dyn Store,
    sources: Vec<Box<dyn Source + 'a>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Box<dyn Source + 'a>) -> Self {
        self.sources.push(source);
        self
    }

    /// Execute one run.
    ///
    /// Errors here are run-fatal (tickers or seen set unavailable). A failed
    /// watch-list sync is logged and the run goes on with the stored tickers.
    /// A source whose listing cannot be read is reported as failed instead.
    pub fn run(&self, watchlist_input: &[String]) -> Result<RunReport> {
        let new_tickers = match sync_watchlist(self.store, watchlist_input) {
            Ok(added) => added,
            Err(err) => {
                error!("Watch-list sync failed, using stored tickers: {:#}", err);
                Vec::new()
            }
        };
        let watchlist = Watchlist::new(self.store.load_tickers().context("Failed to load tickers")?);
        let seen: SeenSet = self
            .store
            .load_seen_urls()
            .context("Failed to load stored post URLs")?;
        info!(
            "Starting run: {} ticker(s), {} stored post URL(s)",
            watchlist.len(),
            seen.len()
        );
        if watchlist.is_empty() {
            warn!("Watch-list is empty, nothing can match");
        }

        let mut report = RunReport {
            new_tickers,
            watchlist_size: watchlist.len(),
            seen_urls: seen.len(),
            sources: Vec::new(),
        };

        for source in &self.sources {
            let kind = source.kind();
            info!("Scanning {}", kind);
            let source_report = match scan_source(source.as_ref(), &watchlist, &seen) {
                Ok(outcome) => {
                    let persisted = persist(self.store, &outcome.extractions);
                    SourceReport::completed(kind, outcome.stats, persisted)
                }
                Err(err) => {
                    error!("{} scan failed: {:#}", kind, err);
                    SourceReport::failed(kind, &err)
                }
            };
            info!(
                "{} done: {} examined, {} matched, {} post(s) saved",
                kind,
                source_report.examined,
                source_report.extracted,
                source_report.persist.posts_saved
            );
            report.sources.push(source_report);
        }

        Ok(report)
    }
}
