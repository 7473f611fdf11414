// Reddit subreddit scraper
//
// The "new" listing is rendered client-side, so pages go through the browser
// retriever. Each thread page yields the post (title + paragraphs) and every
// comment in the tree, nested replies included, in page order.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use super::{all_texts, first_text, selector, Document, PageRequest, Retriever};
use crate::config::RedditConfig;
use crate::crawl::{canonical_url, Candidate, Source};
use crate::db::{ExtractedComment, ExtractedPost, Extraction, SourceKind, Ticker};
use crate::error::ExtractError;
use crate::tickers::Watchlist;
use crate::utils::{join_fragments, normalize_text};

static THREAD_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/comments/([^/]+)/").expect("static thread key regex"));

/// Thread id from a thread URL (`.../comments/<id>/...`)
pub fn thread_key(url: &str) -> Option<&str> {
    THREAD_KEY
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub struct RedditSource<'a> {
    retriever: &'a dyn Retriever,
    config: RedditConfig,
}

impl<'a> RedditSource<'a> {
    pub fn new(retriever: &'a dyn Retriever, config: RedditConfig) -> Self {
        Self { retriever, config }
    }
}

impl Source for RedditSource<'_> {
    fn kind(&self) -> SourceKind {
        SourceKind::Reddit
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        let html = self
            .retriever
            .fetch(&PageRequest::get(&self.config.listing_url))?;
        Ok(parse_listing(&html, &self.config.base_url))
    }

    fn extract(
        &self,
        candidate: &Candidate,
        watchlist: &Watchlist,
    ) -> Result<Option<Extraction>, ExtractError> {
        let key = thread_key(&candidate.url)
            .ok_or_else(|| ExtractError::Parse(format!("no thread id in {}", candidate.url)))?;
        let expand = format!("#t3_{}-read-more-button", key);
        let html = self.retriever.fetch(&PageRequest {
            url: &candidate.url,
            wait_for: None,
            expand: Some(expand.as_str()),
        })?;
        let page = ThreadPage::parse(&html, key);
        Ok(extract_thread(&candidate.url, key, &page, watchlist))
    }
}

/// Thread links on the listing page, newest first
pub fn parse_listing(html: &str, base_url: &str) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let Ok(link_sel) = selector(r#"a[slot="full-post-link"]"#) else {
        return Vec::new();
    };
    document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| canonical_url(base_url, href))
        .map(Candidate::new)
        .collect()
}

/// Build the post and its comments from a thread document.
///
/// Returns `None` when neither title nor body mentions a watch-listed ticker;
/// comments are not looked at in that case.
pub fn extract_thread(
    url: &str,
    key: &str,
    doc: &dyn Document,
    watchlist: &Watchlist,
) -> Option<Extraction> {
    let title = normalize_text(&doc.field("title").unwrap_or_default());
    let body = join_fragments(&doc.fragments("body"));

    let ticker = watchlist.find(&title, &body)?.clone();

    let mut comments = Vec::new();
    for (idx, node) in doc.children("comments").iter().enumerate() {
        match extract_comment(node.as_ref(), &ticker) {
            Ok(Some(comment)) => comments.push(comment),
            Ok(None) => debug!("Comment {} in {} has no text", idx, url),
            Err(err) => warn!("Skipping comment {} in {}: {}", idx, url, err),
        }
    }

    Some(Extraction {
        post: ExtractedPost {
            source: SourceKind::Reddit,
            url: url.to_string(),
            external_id: key.to_string(),
            title,
            description: body,
            ticker_id: ticker.id,
            ticker_symbol: ticker.symbol.clone(),
        },
        comments,
    })
}

fn extract_comment(
    node: &dyn Document,
    ticker: &Ticker,
) -> Result<Option<ExtractedComment>, ExtractError> {
    let author = node
        .field("author")
        .ok_or_else(|| ExtractError::missing("author"))?;
    let text = join_fragments(&node.fragments("body"));
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(ExtractedComment {
        text,
        author,
        ticker_id: ticker.id,
        ticker_symbol: ticker.symbol.clone(),
    }))
}

/// Parsed thread page
pub struct ThreadPage {
    html: Html,
    key: String,
}

impl ThreadPage {
    pub fn parse(html: &str, key: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            key: key.to_string(),
        }
    }
}

impl Document for ThreadPage {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "title" => {
                let css = format!(r#"h1[id="post-title-t3_{}"]"#, self.key);
                first_text(self.html.root_element(), &css).map(|t| t.trim().to_string())
            }
            _ => None,
        }
    }

    fn fragments(&self, name: &str) -> Vec<String> {
        match name {
            "body" => {
                let css = format!(r#"div[id="t3_{}-post-rtjson-content"] p"#, self.key);
                all_texts(self.html.root_element(), &css)
            }
            _ => Vec::new(),
        }
    }

    fn children(&self, name: &str) -> Vec<Box<dyn Document + '_>> {
        if name != "comments" {
            return Vec::new();
        }
        let tree_css = format!(r#"div[id="comment-tree-content-anchor-{}"]"#, self.key);
        let (Ok(tree_sel), Ok(comment_sel)) = (selector(&tree_css), selector("shreddit-comment[thingid]"))
        else {
            return Vec::new();
        };
        let Some(tree) = self.html.select(&tree_sel).next() else {
            return Vec::new();
        };
        tree.select(&comment_sel)
            .map(|el| Box::new(CommentNode { el }) as Box<dyn Document + '_>)
            .collect()
    }
}

/// One `shreddit-comment` element
struct CommentNode<'a> {
    el: ElementRef<'a>,
}

impl Document for CommentNode<'_> {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "author" => self.el.value().attr("author").map(str::to_string),
            "id" => self.el.value().attr("thingid").map(str::to_string),
            _ => None,
        }
    }

    fn fragments(&self, name: &str) -> Vec<String> {
        match (name, self.el.value().attr("thingid")) {
            ("body", Some(thing)) => {
                let css = format!(r#"div[id="{}-comment-rtjson-content"] p"#, thing);
                all_texts(self.el, &css)
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::Record;

    fn watchlist() -> Watchlist {
        Watchlist::new(vec![
            Ticker {
                id: 1,
                symbol: "BHP".to_string(),
            },
            Ticker {
                id: 2,
                symbol: "CBA".to_string(),
            },
        ])
    }

    const THREAD_HTML: &str = r#"
<html><body>
<h1 id="post-title-t3_1abcde">  Thoughts on   the miners? </h1>
<div id="t3_1abcde-post-rtjson-content">
  <p>I have been buying   <b>BHP</b> lately.</p>
  <p>It’s cheap.</p>
</div>
<div id="comment-tree-content-anchor-1abcde">
  <shreddit-comment thingid="t1_aaa" author="alice">
    <div id="t1_aaa-comment-rtjson-content"><p>Same here</p><p>Long term hold</p></div>
    <shreddit-comment thingid="t1_bbb" author="bob">
      <div id="t1_bbb-comment-rtjson-content"><p>  Agreed  </p></div>
    </shreddit-comment>
  </shreddit-comment>
  <shreddit-comment thingid="t1_ccc">
    <div id="t1_ccc-comment-rtjson-content"><p>no author</p></div>
  </shreddit-comment>
  <shreddit-comment thingid="t1_ddd" author="dave">
    <div id="t1_ddd-comment-rtjson-content"></div>
  </shreddit-comment>
  <shreddit-comment author="ghost"><p>no thing id</p></shreddit-comment>
  <shreddit-comment thingid="t1_eee" author="erin">
    <div id="t1_eee-comment-rtjson-content"><p>Last one</p></div>
  </shreddit-comment>
</div>
</body></html>"#;

    #[test]
    fn test_thread_key_from_url() {
        assert_eq!(
            thread_key("https://www.reddit.com/r/ausstocks/comments/1abcde/thoughts/"),
            Some("1abcde")
        );
        assert_eq!(thread_key("https://www.reddit.com/r/ausstocks/new/"), None);
    }

    #[test]
    fn test_parse_listing_keeps_document_order() {
        let html = r#"
            <a slot="full-post-link" href="/r/ausstocks/comments/222/second/">b</a>
            <a slot="other" href="/r/ausstocks/comments/999/ignored/">x</a>
            <a slot="full-post-link" href="/r/ausstocks/comments/111/first/">a</a>
        "#;
        let urls: Vec<_> = parse_listing(html, "https://www.reddit.com")
            .into_iter()
            .map(|c| c.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://www.reddit.com/r/ausstocks/comments/222/second/",
                "https://www.reddit.com/r/ausstocks/comments/111/first/",
            ]
        );
    }

    #[test]
    fn test_extract_thread_with_comments() {
        let url = "https://www.reddit.com/r/ausstocks/comments/1abcde/thoughts/";
        let page = ThreadPage::parse(THREAD_HTML, "1abcde");
        let extraction = extract_thread(url, "1abcde", &page, &watchlist()).expect("match");

        let post = &extraction.post;
        assert_eq!(post.source, SourceKind::Reddit);
        assert_eq!(post.external_id, "1abcde");
        assert_eq!(post.title, "Thoughts on the miners?");
        assert_eq!(post.ticker_id, 1);
        assert_eq!(post.ticker_symbol, "BHP");
        assert!(post.description.starts_with("I have been buying BHP lately.\n"));

        let comments: Vec<_> = extraction
            .comments
            .iter()
            .map(|c| (c.author.as_str(), c.text.as_str()))
            .collect();
        assert_eq!(
            comments,
            vec![
                ("alice", "Same here\nLong term hold"),
                ("bob", "Agreed"),
                ("erin", "Last one"),
            ]
        );
        assert!(extraction.comments.iter().all(|c| c.ticker_symbol == "BHP"));
    }

    #[test]
    fn test_no_ticker_means_no_post_and_no_comments() {
        let doc = Record::new()
            .with_field("title", "General chat")
            .with_fragments("body", vec!["nothing relevant"])
            .with_child(
                "comments",
                Record::new()
                    .with_field("author", "x")
                    .with_fragments("body", vec!["BHP mentioned only here"]),
            );
        assert!(extract_thread("u", "k", &doc, &watchlist()).is_none());
    }

    #[test]
    fn test_ticker_in_title_only_matches() {
        let doc = Record::new().with_field("title", "CBA dividend");
        let extraction = extract_thread("u", "k", &doc, &watchlist()).expect("match");
        assert_eq!(extraction.post.ticker_symbol, "CBA");
        assert_eq!(extraction.post.description, "");
        assert!(extraction.comments.is_empty());
    }

    #[test]
    fn test_missing_thread_parts_do_not_panic() {
        let page = ThreadPage::parse("<html><body><p>BHP</p></body></html>", "zzz");
        assert!(page.field("title").is_none());
        assert!(page.fragments("body").is_empty());
        assert!(page.children("comments").is_empty());
        assert!(extract_thread("u", "zzz", &page, &watchlist()).is_none());
    }
}
