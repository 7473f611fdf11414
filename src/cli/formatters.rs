//! Output formatting module for CLI display
//!
//! Rendering of run reports, tickers and stored posts, kept apart from the
//! code that produces them.

use colored::Colorize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::db::{StoredPost, Ticker};
use crate::pipeline::RunReport;
use crate::utils::truncate_chars;

/// Format a run report for JSON output
pub fn format_run_json(report: &RunReport) -> String {
    #[derive(serde::Serialize)]
    struct JsonRun<'a> {
        success: bool,
        #[serde(flatten)]
        report: &'a RunReport,
    }

    serde_json::to_string_pretty(&JsonRun {
        success: report.success(),
        report,
    })
    .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Format a run report for terminal table output
pub fn format_run_table(report: &RunReport) -> String {
    #[derive(Tabled)]
    struct SourceRow {
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Examined")]
        examined: usize,
        #[tabled(rename = "Matched")]
        matched: usize,
        #[tabled(rename = "Failed")]
        failed: usize,
        #[tabled(rename = "Posts")]
        posts: usize,
        #[tabled(rename = "Comments")]
        comments: usize,
    }

    let mut output = String::new();

    if !report.new_tickers.is_empty() {
        output.push_str(&format!(
            "{} Added {} ticker(s): {}\n",
            "✓".green().bold(),
            report.new_tickers.len(),
            report.new_tickers.join(", ")
        ));
    }
    output.push_str(&format!(
        "Watch-list: {} ticker(s), {} stored post(s) before this run\n\n",
        report.watchlist_size, report.seen_urls
    ));

    let rows: Vec<SourceRow> = report
        .sources
        .iter()
        .map(|s| SourceRow {
            source: s.source.as_str().to_string(),
            status: if s.ok {
                "ok".green().to_string()
            } else {
                "failed".red().to_string()
            },
            examined: s.examined,
            matched: s.extracted,
            failed: s.failed + s.persist.posts_failed,
            posts: s.persist.posts_saved,
            comments: s.persist.comments_saved,
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    output.push_str(&table);
    output.push('\n');

    for source in report.sources.iter().filter(|s| !s.ok) {
        if let Some(err) = &source.error {
            output.push_str(&format!("\n{} {}: {}", "✗".red().bold(), source.source, err));
        }
    }

    if report.success() {
        output.push_str(&format!("\n{} Scraping completed successfully.\n", "✓".green().bold()));
    } else {
        output.push_str(&format!("\n{} Scraping encountered errors.\n", "✗".red().bold()));
    }

    output
}

pub fn format_tickers_table(tickers: &[Ticker]) -> String {
    #[derive(Tabled)]
    struct TickerRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Symbol")]
        symbol: String,
    }

    if tickers.is_empty() {
        return "No tickers stored. Run `stockwatch tickers sync <csv>` first.".to_string();
    }

    let rows: Vec<TickerRow> = tickers
        .iter()
        .map(|t| TickerRow {
            id: t.id,
            symbol: t.symbol.clone(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn format_status(posts: i64, comments: i64, recent: &[StoredPost]) -> String {
    #[derive(Tabled)]
    struct PostRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Stored")]
        stored: String,
    }

    let mut output = format!(
        "Posts: {}\nComments: {}\n",
        posts.to_string().cyan(),
        comments.to_string().cyan()
    );
    if recent.is_empty() {
        return output;
    }

    let rows: Vec<PostRow> = recent
        .iter()
        .map(|p| PostRow {
            id: p.id,
            source: p.source.clone(),
            ticker: p.ticker_symbol.clone(),
            title: truncate_chars(&p.title, 40).to_string(),
            stored: p.created_at.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    output.push('\n');
    output.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    output
}
