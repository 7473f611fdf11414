// Headless Chrome retriever
//
// One browser and one tab per run. The browser process is shut down when the
// retriever is dropped, so every exit path releases it.

use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{PageRequest, Retriever};
use crate::config::BrowserConfig;
use crate::error::ExtractError;

pub struct ChromeRetriever {
    // Kept alive for the lifetime of the tab
    _browser: Browser,
    tab: Arc<Tab>,
    settle: Duration,
    timeout: Duration,
}

impl ChromeRetriever {
    /// Launch headless Chrome
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        info!("Launching headless Chrome browser");

        let owned_args: Vec<OsString> = vec![
            OsString::from("--blink-settings=imagesEnabled=false"),
            OsString::from("--disable-blink-features=AutomationControlled"),
            OsString::from(format!("--user-agent={}", config.user_agent)),
            OsString::from("--disable-dev-shm-usage"),
        ];

        let options = LaunchOptions {
            headless: config.headless,
            sandbox: false,
            path: config.chrome_path.clone(),
            window_size: Some(config.window_size),
            idle_browser_timeout: Duration::from_secs(config.timeout_secs.max(1) * 4),
            args: owned_args.iter().map(|a| a.as_os_str()).collect(),
            ..Default::default()
        };

        let browser = Browser::new(options)
            .context("Failed to launch headless Chrome. Is Chrome/Chromium installed?")?;
        let tab = browser
            .new_tab()
            .context("Failed to create new browser tab")?;
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        tab.set_default_timeout(timeout);

        Ok(Self {
            _browser: browser,
            tab,
            settle: Duration::from_millis(config.settle_ms),
            timeout,
        })
    }

    fn load(&self, request: &PageRequest<'_>) -> Result<String> {
        self.tab
            .navigate_to(request.url)
            .context("Failed to navigate to URL")?;
        self.tab
            .wait_for_element_with_custom_timeout("body", self.timeout)
            .context("Timed out waiting for page to load")?;

        if let Some(css) = request.wait_for {
            self.tab
                .wait_for_element_with_custom_timeout(css, self.timeout)
                .with_context(|| format!("Timed out waiting for {}", css))?;
        }

        if let Some(css) = request.expand {
            // The button is only rendered for long posts
            match self.tab.find_element(css) {
                Ok(button) => {
                    if let Err(err) = button.click() {
                        debug!("Could not click {}: {}", css, err);
                    }
                }
                Err(_) => debug!("No {} on {}", css, request.url),
            }
        }

        std::thread::sleep(self.settle);

        self.tab.get_content().context("Failed to get page content")
    }
}

impl Retriever for ChromeRetriever {
    fn fetch(&self, request: &PageRequest<'_>) -> Result<String, ExtractError> {
        debug!("Loading {} in browser", request.url);
        self.load(request)
            .map_err(|e| ExtractError::Fetch(format!("{}: {:#}", request.url, e)))
    }
}
