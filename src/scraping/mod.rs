// Page retrieval and per-site extraction
// Reddit needs a real browser; HotCopper pages are plain HTML

pub mod browser;
pub mod hotcopper;
pub mod http;
pub mod reddit;

use scraper::{ElementRef, Selector};
use std::collections::BTreeMap;

use crate::error::ExtractError;

pub use browser::ChromeRetriever;
pub use hotcopper::HotCopperSource;
pub use http::HttpRetriever;
pub use reddit::RedditSource;

/// What to load and how to prepare the page before reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<'a> {
    pub url: &'a str,
    /// Selector to wait for after navigation
    pub wait_for: Option<&'a str>,
    /// Selector to click (e.g. "read more") before reading the page
    pub expand: Option<&'a str>,
}

impl<'a> PageRequest<'a> {
    pub fn get(url: &'a str) -> Self {
        Self {
            url,
            wait_for: None,
            expand: None,
        }
    }
}

/// Retrieval collaborator: returns the page HTML for a request
pub trait Retriever {
    fn fetch(&self, request: &PageRequest<'_>) -> Result<String, ExtractError>;
}

/// Field access over one scraped document or fragment.
///
/// Extractors only depend on this, never on a particular markup tree.
pub trait Document {
    /// Text of a single named field
    fn field(&self, name: &str) -> Option<String>;

    /// Ordered text fragments (e.g. paragraphs) of a named field
    fn fragments(&self, name: &str) -> Vec<String> {
        self.field(name).into_iter().collect()
    }

    /// Nested documents (e.g. comments)
    fn children(&self, _name: &str) -> Vec<Box<dyn Document + '_>> {
        Vec::new()
    }
}

/// Owned field bag used for listing rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Vec<String>>,
    children: BTreeMap<String, Vec<Record>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), vec![value.into()]);
        self
    }

    pub fn with_fragments<S: Into<String>>(mut self, name: &str, values: Vec<S>) -> Self {
        self.fields
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_child(mut self, name: &str, child: Record) -> Self {
        self.children.entry(name.to_string()).or_default().push(child);
        self
    }

    pub fn set(&mut self, name: &str, value: Option<String>) {
        match value {
            Some(value) => {
                self.fields.insert(name.to_string(), vec![value]);
            }
            None => {
                self.fields.remove(name);
            }
        }
    }
}

impl Document for Record {
    fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|v| v.first()).cloned()
    }

    fn fragments(&self, name: &str) -> Vec<String> {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    fn children(&self, name: &str) -> Vec<Box<dyn Document + '_>> {
        self.children
            .get(name)
            .map(|list| {
                list.iter()
                    .map(|c| Box::new(c.clone()) as Box<dyn Document>)
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Parse(format!("bad selector {}: {}", css, e)))
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join("")
}

/// Text of the first element matching `css` below `root`
pub(crate) fn first_text(root: ElementRef<'_>, css: &str) -> Option<String> {
    let sel = selector(css).ok()?;
    root.select(&sel).next().map(element_text)
}

/// Trimmed text of every element matching `css` below `root`
pub(crate) fn all_texts(root: ElementRef<'_>, css: &str) -> Vec<String> {
    match selector(css) {
        Ok(sel) => root
            .select(&sel)
            .map(|el| element_text(el).trim().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}
