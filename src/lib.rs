//! Stockwatch - ticker mention crawler
//!
//! Walks the newest posts on Reddit (r/ausstocks) and HotCopper, keeps the
//! ones that mention a watch-listed ticker, and stores them with their
//! comments. Each source is scanned only down to the first post stored by an
//! earlier run.

pub mod cli;
pub mod config;
pub mod crawl;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod scraping;
pub mod tickers;
pub mod utils;
