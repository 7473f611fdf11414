use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Watch-listed stock symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Ticker {
    pub id: i64,
    pub symbol: String,
}

/// Discussion site a post was scraped from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Reddit,    // threaded discussions with nested comments
    HotCopper, // forum listing with linked post pages
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Reddit => "Reddit",
            SourceKind::HotCopper => "Hotcopper",
        }
    }
}

impl FromStr for SourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(SourceKind::Reddit),
            "hotcopper" => Ok(SourceKind::HotCopper),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post that mentions a watch-listed ticker
///
/// Only built after the watch-list confirmed a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedPost {
    pub source: SourceKind,
    pub url: String,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub ticker_id: i64,
    pub ticker_symbol: String,
}

/// Comment belonging to an extracted post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedComment {
    pub text: String,
    pub author: String,
    pub ticker_id: i64,
    pub ticker_symbol: String,
}

/// A post together with its comments, in page order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub post: ExtractedPost,
    pub comments: Vec<ExtractedComment>,
}

/// Stored post summary, used by `status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: i64,
    pub source: String,
    pub url: String,
    pub title: String,
    pub ticker_symbol: String,
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_round_trips_through_str() {
        for kind in [SourceKind::Reddit, SourceKind::HotCopper] {
            assert_eq!(kind.as_str().parse::<SourceKind>(), Ok(kind));
        }
        assert_eq!("HOTCOPPER".parse::<SourceKind>(), Ok(SourceKind::HotCopper));
        assert!("twitter".parse::<SourceKind>().is_err());
    }
}
