//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output, with a hint where one helps.
pub fn map_error(e: &ApiError) -> String {
    let hint = match e {
        ApiError::ProviderNotConfigured(_) | ApiError::ProviderAuthFailed(_) => {
            Some("set provider.api_key or the provider's API key environment variable")
        }
        ApiError::BrowserError(_) => {
            Some("check that a WebDriver server is running at harness.webdriver_url")
        }
        ApiError::ConfigError(_) => Some("run `pageforge config` to inspect the effective configuration"),
        _ => None,
    };
    match hint {
        Some(hint) => format!("{}\nhint: {}", e, hint),
        None => e.to_string(),
    }
}
