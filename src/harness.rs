//! Validation Harness
//!
//! Decides whether a candidate page is acceptable. Cheap text checks run first;
//! only a structurally sound page is rendered in a headless browser, where any
//! console error fails it.

pub mod checks;
pub mod webdriver;

use crate::error::ApiError;
use crate::store::PageStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use webdriver::{LogEntry, SessionTimeouts, WebDriverClient, WebDriverSession};

/// Result of testing one candidate page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    /// Diagnostic reason; `None` exactly when `passed`
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Pluggable page validator
#[async_trait]
pub trait ValidationHarness: Send + Sync {
    async fn test_page(&self, body: &str) -> ValidationOutcome;
}

/// `[harness]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// chromedriver (or any W3C WebDriver) endpoint
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Base URL the browser uses to reach the front-end; derived from `[server]` when unset
    #[serde(default)]
    pub frontend_url: Option<String>,

    #[serde(default = "default_browser_name")]
    pub browser_name: String,

    #[serde(default = "default_browser_args")]
    pub browser_args: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub page_load_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub script_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub implicit_wait_secs: u64,

    /// Pause after the load event so errors from immediate timers reach the log
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_browser_name() -> String {
    "chrome".to_string()
}

fn default_browser_args() -> Vec<String> {
    [
        "--headless",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--window-size=1920,1080",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_settle_ms() -> u64 {
    250
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            frontend_url: None,
            browser_name: default_browser_name(),
            browser_args: default_browser_args(),
            page_load_timeout_secs: default_timeout_secs(),
            script_timeout_secs: default_timeout_secs(),
            implicit_wait_secs: default_timeout_secs(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), String> {
        reqwest::Url::parse(&self.webdriver_url)
            .map_err(|e| format!("Invalid webdriver_url '{}': {}", self.webdriver_url, e))?;
        if let Some(url) = &self.frontend_url {
            reqwest::Url::parse(url)
                .map_err(|e| format!("Invalid frontend_url '{}': {}", url, e))?;
        }
        if self.page_load_timeout_secs == 0 {
            return Err("page_load_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            script: Duration::from_secs(self.script_timeout_secs),
            page_load: Duration::from_secs(self.page_load_timeout_secs),
            implicit: Duration::from_secs(self.implicit_wait_secs),
        }
    }
}

/// Harness backed by a real browser through WebDriver
///
/// Candidates are written to a throwaway slot in the page store and loaded
/// through the live front-end at `<frontend_url>/pages/<slot>`.
pub struct BrowserHarness {
    config: HarnessConfig,
    pages: Arc<PageStore>,
    driver: WebDriverClient,
    frontend_url: String,
}

impl BrowserHarness {
    pub fn new(
        config: HarnessConfig,
        pages: Arc<PageStore>,
        frontend_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        // Driver calls must outlive the browser's own page-load timeout
        let request_timeout = Duration::from_secs(config.page_load_timeout_secs + 20);
        let driver = WebDriverClient::new(&config.webdriver_url, request_timeout)?;
        Ok(Self {
            config,
            pages,
            driver,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    /// Render the candidate and collect console errors
    async fn render(&self, body: &str) -> Result<Vec<LogEntry>, ApiError> {
        let slot = self.pages.stage_temporary(body)?;
        let session = self
            .driver
            .new_session(&self.config.browser_name, &self.config.browser_args)
            .await?;

        let url = format!("{}/pages/{}", self.frontend_url, slot.name());
        let result = self.inspect(&session, &url).await;

        if let Err(e) = session.quit().await {
            warn!(error = %e, "Failed to close WebDriver session");
        }
        result
    }

    async fn inspect(
        &self,
        session: &WebDriverSession<'_>,
        url: &str,
    ) -> Result<Vec<LogEntry>, ApiError> {
        session.set_timeouts(self.config.timeouts()).await?;
        session.navigate(url).await?;
        if self.config.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        }
        let entries = session.browser_log().await?;
        Ok(entries.into_iter().filter(LogEntry::is_error).collect())
    }
}

#[async_trait]
impl ValidationHarness for BrowserHarness {
    async fn test_page(&self, body: &str) -> ValidationOutcome {
        if let Err(reason) = checks::check_document(body) {
            debug!(reason = %reason, "Candidate failed text checks");
            return ValidationOutcome::fail(reason);
        }

        match self.render(body).await {
            Ok(errors) if errors.is_empty() => {
                info!("Candidate rendered without console errors");
                ValidationOutcome::pass()
            }
            Ok(errors) => {
                let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                ValidationOutcome::fail(format!("JavaScript errors: {}", messages.join("; ")))
            }
            Err(ApiError::PageLoadTimeout) => ValidationOutcome::fail("Page load timeout"),
            Err(e) => {
                warn!(error = %e, "Browser validation failed");
                ValidationOutcome::fail(e.to_string())
            }
        }
    }
}
