// HotCopper forum scraper
//
// The post listing is a table; each row carries up to three title fragments
// (forum, stock pill, subject). Only rows whose title mentions a watch-listed
// ticker get their post page fetched for the message body.

use anyhow::Result;
use scraper::Html;
use tracing::debug;

use super::{element_text, first_text, selector, Document, PageRequest, Record, Retriever};
use crate::config::HotCopperConfig;
use crate::crawl::{canonical_url, Candidate, Source};
use crate::db::{ExtractedPost, Extraction, SourceKind, Ticker};
use crate::error::ExtractError;
use crate::tickers::Watchlist;
use crate::utils::normalize_text;

/// Title fragments, in display order
pub const TITLE_FIELDS: [&str; 3] = ["forum", "pill", "subject"];

pub struct HotCopperSource<'a> {
    retriever: &'a dyn Retriever,
    config: HotCopperConfig,
}

impl<'a> HotCopperSource<'a> {
    pub fn new(retriever: &'a dyn Retriever, config: HotCopperConfig) -> Self {
        Self { retriever, config }
    }
}

impl Source for HotCopperSource<'_> {
    fn kind(&self) -> SourceKind {
        SourceKind::HotCopper
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        let html = self
            .retriever
            .fetch(&PageRequest::get(&self.config.listing_url))?;
        Ok(parse_listing(&html, &self.config.base_url)?)
    }

    fn extract(
        &self,
        candidate: &Candidate,
        watchlist: &Watchlist,
    ) -> Result<Option<Extraction>, ExtractError> {
        let title = compose_title(&candidate.row);
        let Some(ticker) = watchlist.find(&title, "") else {
            return Ok(None);
        };

        let html = self.retriever.fetch(&PageRequest::get(&candidate.url))?;
        let detail = DetailPage::parse(&html);
        let post = build_post(&candidate.url, title, ticker, &detail);
        if post.is_none() {
            debug!("No message body on {}", candidate.url);
        }
        Ok(post.map(|post| Extraction {
            post,
            comments: Vec::new(),
        }))
    }
}

/// Listing rows that link to a post, in table order (newest first).
///
/// A page without the listing table is an error: the whole source failed.
pub fn parse_listing(html: &str, base_url: &str) -> Result<Vec<Candidate>, ExtractError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table.table.is-fullwidth")?;
    let row_sel = selector("tr")?;
    let subject_sel = selector("a.subject-a")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| ExtractError::missing("listing table"))?;

    let mut candidates = Vec::new();
    for row in table.select(&row_sel) {
        let Some(subject) = row.select(&subject_sel).next() else {
            continue;
        };
        let Some(url) = subject
            .value()
            .attr("href")
            .and_then(|href| canonical_url(base_url, href))
        else {
            continue;
        };

        let mut record = Record::new();
        record.set("forum", first_text(row, "td.forum-td a"));
        record.set("pill", first_text(row, "span.stock-pill a"));
        record.set("subject", Some(element_text(subject)));
        candidates.push(Candidate::with_row(url, record));
    }

    Ok(candidates)
}

/// Non-empty title fragments joined by single spaces, normalized
pub fn compose_title(row: &dyn Document) -> String {
    let parts: Vec<String> = TITLE_FIELDS
        .iter()
        .filter_map(|name| row.field(name))
        .map(|part| normalize_text(&part))
        .filter(|part| !part.is_empty())
        .collect();
    normalize_text(&parts.join(" "))
}

/// External id: everything after `post_id=`, or empty
pub fn post_id_from_url(url: &str) -> &str {
    const MARKER: &str = "post_id=";
    url.find(MARKER)
        .map(|idx| &url[idx + MARKER.len()..])
        .unwrap_or("")
}

/// Post for a matched row; `None` when the page has no message body.
pub fn build_post(
    url: &str,
    title: String,
    ticker: &Ticker,
    detail: &dyn Document,
) -> Option<ExtractedPost> {
    let body = normalize_text(&detail.field("body")?);
    if body.is_empty() {
        return None;
    }
    Some(ExtractedPost {
        source: SourceKind::HotCopper,
        url: url.to_string(),
        external_id: post_id_from_url(url).to_string(),
        title,
        description: body,
        ticker_id: ticker.id,
        ticker_symbol: ticker.symbol.clone(),
    })
}

/// Parsed post page
pub struct DetailPage {
    html: Html,
}

impl DetailPage {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }
}

impl Document for DetailPage {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "body" => first_text(
                self.html.root_element(),
                "blockquote.message-text.ugc.baseHtml",
            ),
            _ => None,
        }
    }
}
