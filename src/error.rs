//! Error handling for stockwatch
//!
//! Per-item failures (one thread, one listing row, one comment) are typed so
//! the crawl can log and skip them. Everything else flows through anyhow for
//! context chaining.

use thiserror::Error;

/// Failure while turning one candidate into a post
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl ExtractError {
    pub fn missing(field: impl Into<String>) -> Self {
        ExtractError::MissingField(field.into())
    }
}

/// Result type alias for run-level operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = ExtractError::Fetch("timed out".to_string());
        assert_eq!(err.to_string(), "fetch error: timed out");
    }

    #[test]
    fn test_missing_field_names_the_field() {
        let err = ExtractError::missing("author");
        assert_eq!(err.to_string(), "missing field: author");
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: Result<()> = Err(anyhow::Error::new(ExtractError::Parse("bad".into())))
            .context("failed to scan reddit");
        match result {
            Err(e) => {
                assert!(e.to_string().contains("failed to scan reddit"));
                let debug_msg = format!("{:?}", e);
                assert!(debug_msg.contains("parse error: bad"));
            }
            Ok(_) => panic!("expected error"),
        }
    }
}
