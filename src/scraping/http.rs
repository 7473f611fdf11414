// Plain HTTP retriever for pages that render server-side
//
// Single attempt per request; wait/expand hints are browser-only and ignored.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

use super::{PageRequest, Retriever};
use crate::config::BrowserConfig;
use crate::error::ExtractError;

pub struct HttpRetriever {
    client: Client,
}

impl HttpRetriever {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed for {}", url))?;
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("failed reading response for {}", url))?;
        if !status.is_success() {
            anyhow::bail!("request failed: {} ({})", url, status);
        }
        Ok(body)
    }
}

impl Retriever for HttpRetriever {
    fn fetch(&self, request: &PageRequest<'_>) -> Result<String, ExtractError> {
        debug!("GET {}", request.url);
        self.get(request.url)
            .map_err(|e| ExtractError::Fetch(format!("{:#}", e)))
    }
}
