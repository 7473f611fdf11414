//! Command dispatcher: turns parsed CLI commands into store/crawl calls

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::cli::{formatters, Commands, TickersCommands};
use crate::config::Config;
use crate::crawl::Source;
use crate::db::{self, SourceKind, SqliteStore, Store};
use crate::pipeline::{self, Orchestrator, RunReport};
use crate::scraping::{ChromeRetriever, HotCopperSource, HttpRetriever, RedditSource, Retriever};
use crate::tickers;

/// Settings resolved from config file and global flags
pub struct AppContext {
    pub config: Config,
    pub db_path: Option<PathBuf>,
    pub json_output: bool,
}

impl AppContext {
    fn open_store(&self) -> Result<SqliteStore> {
        db::open_store(self.db_path.as_deref())
    }
}

/// Run a command. Returns whether it succeeded (a run with a failed source
/// returns `false`).
pub fn dispatch(command: Commands, ctx: &AppContext) -> Result<bool> {
    match command {
        Commands::Init => {
            db::init_database(ctx.db_path.clone())?;
            println!("Database ready.");
            Ok(true)
        }
        Commands::Run {
            watchlist,
            only,
            http,
            ..
        } => {
            let watchlist_path = watchlist.unwrap_or_else(|| ctx.config.watchlist.clone());
            let report = run_crawl(ctx, &watchlist_path, only.map(SourceKind::from), http)?;
            if ctx.json_output {
                println!("{}", formatters::format_run_json(&report));
            } else {
                println!("{}", formatters::format_run_table(&report));
            }
            Ok(report.success())
        }
        Commands::Tickers { action } => dispatch_tickers(action, ctx),
        Commands::Status { limit } => {
            let store = ctx.open_store()?;
            let posts = store.count_posts()?;
            let comments = store.count_comments()?;
            let recent = store.recent_posts(limit)?;
            if ctx.json_output {
                let payload = serde_json::json!({
                    "posts": posts,
                    "comments": comments,
                    "recent": recent,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{}", formatters::format_status(posts, comments, &recent));
            }
            Ok(true)
        }
    }
}

fn dispatch_tickers(action: TickersCommands, ctx: &AppContext) -> Result<bool> {
    let store = ctx.open_store()?;
    match action {
        TickersCommands::Sync { file } => {
            let symbols = tickers::load_symbols(&file)?;
            let added = pipeline::sync_watchlist(&store, &symbols)?;
            if ctx.json_output {
                println!("{}", serde_json::json!({ "added": added }));
            } else if added.is_empty() {
                println!("No new tickers in {}", file.display());
            } else {
                println!("Added {} ticker(s): {}", added.len(), added.join(", "));
            }
            Ok(true)
        }
        TickersCommands::List => {
            let tickers = store.load_tickers()?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&tickers)?);
            } else {
                println!("{}", formatters::format_tickers_table(&tickers));
            }
            Ok(true)
        }
    }
}

fn source_enabled(ctx: &AppContext, only: Option<SourceKind>, kind: SourceKind) -> bool {
    let configured = match kind {
        SourceKind::Reddit => ctx.config.reddit.enabled,
        SourceKind::HotCopper => ctx.config.hotcopper.enabled,
    };
    match only {
        Some(selected) => selected == kind,
        None => configured,
    }
}

/// Full crawl: the retriever is acquired once here and released when this
/// function returns, on success or error.
pub fn run_crawl(
    ctx: &AppContext,
    watchlist_path: &std::path::Path,
    only: Option<SourceKind>,
    use_http: bool,
) -> Result<RunReport> {
    let symbols = tickers::load_symbols(watchlist_path)?;
    info!("Loaded {} symbol(s) from {}", symbols.len(), watchlist_path.display());

    let store = ctx.open_store()?;

    let reddit = source_enabled(ctx, only, SourceKind::Reddit);
    let hotcopper = source_enabled(ctx, only, SourceKind::HotCopper);

    let retriever: Option<Box<dyn Retriever>> = if !reddit && !hotcopper {
        None
    } else if use_http {
        Some(Box::new(HttpRetriever::new(&ctx.config.browser)?))
    } else {
        Some(Box::new(
            ChromeRetriever::launch(&ctx.config.browser).context("Failed to start browser session")?,
        ))
    };

    let mut orchestrator = Orchestrator::new(&store as &dyn Store);
    if let Some(retriever) = retriever.as_deref() {
        if reddit {
            let source: Box<dyn Source + '_> =
                Box::new(RedditSource::new(retriever, ctx.config.reddit.clone()));
            orchestrator = orchestrator.with_source(source);
        }
        if hotcopper {
            let source: Box<dyn Source + '_> =
                Box::new(HotCopperSource::new(retriever, ctx.config.hotcopper.clone()));
            orchestrator = orchestrator.with_source(source);
        }
    }

    orchestrator.run(&symbols)
}
