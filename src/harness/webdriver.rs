//! Minimal W3C WebDriver client
//!
//! Covers only what page validation needs: create a session, set timeouts,
//! navigate, read the browser console log and delete the session.

use crate::error::ApiError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Browser log entry as returned by the `se/log` endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl LogEntry {
    /// `SEVERE` and `ERROR` entries count as JavaScript errors
    pub fn is_error(&self) -> bool {
        matches!(
            self.level.to_ascii_uppercase().as_str(),
            "SEVERE" | "ERROR"
        )
    }
}

/// Session timeouts, sent to the driver in milliseconds
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    pub script: Duration,
    pub page_load: Duration,
    pub implicit: Duration,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

/// Client bound to one WebDriver server
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: Client,
    base_url: String,
}

impl WebDriverClient {
    /// `request_timeout` bounds each HTTP call to the driver
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::BrowserError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a headless browser session
    pub async fn new_session(
        &self,
        browser_name: &str,
        args: &[String],
    ) -> Result<WebDriverSession<'_>, ApiError> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": browser_name,
                    "goog:chromeOptions": { "args": args },
                    "goog:loggingPrefs": { "browser": "ALL" }
                }
            }
        });

        let value = self
            .send(self.http.post(self.url("/session")).json(&capabilities))
            .await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::BrowserError("WebDriver returned no sessionId".to_string())
            })?
            .to_string();

        debug!(session_id = %id, "WebDriver session started");
        Ok(WebDriverSession { client: self, id })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body: WireResponse = response.json().await.map_err(|e| {
            ApiError::BrowserError(format!("Invalid WebDriver response: {}", e))
        })?;

        if status.is_success() {
            return Ok(body.value);
        }

        let error: WireError = serde_json::from_value(body.value).unwrap_or(WireError {
            error: format!("http {}", status.as_u16()),
            message: String::new(),
        });
        Err(map_wire_error(&error))
    }
}

/// Live session; call [`WebDriverSession::quit`] on every exit path
pub struct WebDriverSession<'a> {
    client: &'a WebDriverClient,
    id: String,
}

impl WebDriverSession<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn set_timeouts(&self, timeouts: SessionTimeouts) -> Result<(), ApiError> {
        let body = json!({
            "script": timeouts.script.as_millis() as u64,
            "pageLoad": timeouts.page_load.as_millis() as u64,
            "implicit": timeouts.implicit.as_millis() as u64,
        });
        self.client
            .send(self.client.http.post(self.path("/timeouts")).json(&body))
            .await?;
        Ok(())
    }

    /// Navigate and wait for the load event
    pub async fn navigate(&self, url: &str) -> Result<(), ApiError> {
        debug!(session_id = %self.id, url, "Navigating");
        self.client
            .send(
                self.client
                    .http
                    .post(self.path("/url"))
                    .json(&json!({ "url": url })),
            )
            .await?;
        Ok(())
    }

    /// Drain the `browser` log
    ///
    /// Uses the `se/log` endpoint and falls back to the legacy `log` endpoint
    /// for drivers that only expose the older one.
    pub async fn browser_log(&self) -> Result<Vec<LogEntry>, ApiError> {
        let body = json!({ "type": "browser" });
        let value = match self
            .client
            .send(self.client.http.post(self.path("/se/log")).json(&body))
            .await
        {
            Ok(value) => value,
            Err(ApiError::BrowserError(msg)) if msg.starts_with("unknown command") => {
                self.client
                    .send(self.client.http.post(self.path("/log")).json(&body))
                    .await?
            }
            Err(e) => return Err(e),
        };

        serde_json::from_value(value)
            .map_err(|e| ApiError::BrowserError(format!("Invalid browser log: {}", e)))
    }

    /// Delete the session, closing the browser
    pub async fn quit(self) -> Result<(), ApiError> {
        self.client
            .send(self.client.http.delete(self.path("")))
            .await?;
        debug!(session_id = %self.id, "WebDriver session closed");
        Ok(())
    }

    fn path(&self, suffix: &str) -> String {
        self.client.url(&format!("/session/{}{}", self.id, suffix))
    }
}

fn map_wire_error(error: &WireError) -> ApiError {
    match error.error.as_str() {
        "timeout" | "script timeout" => ApiError::PageLoadTimeout,
        _ if error.message.is_empty() => ApiError::BrowserError(error.error.clone()),
        _ => ApiError::BrowserError(format!("{}: {}", error.error, error.message)),
    }
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::PageLoadTimeout
    } else if error.is_connect() {
        ApiError::BrowserError(format!("WebDriver unreachable: {}", error))
    } else {
        ApiError::BrowserError(format!("WebDriver request failed: {}", error))
    }
}
