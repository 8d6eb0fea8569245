//! Error types for the page generation pipeline.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Invalid page name: {0}")]
    InvalidPageName(String),

    #[error("Metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised by providers, the harness, configuration and the HTTP surface
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Provider response truncated at the token limit")]
    TruncatedResponse,

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error: missing template '{0}'")]
    MissingTemplate(String),

    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("Page load timeout")]
    PageLoadTimeout,

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Queue error: {0}")]
    QueueError(String),
}

impl ApiError {
    /// Whether the error originated at the text-generation service
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            ApiError::ProviderError(_)
                | ApiError::ProviderNotConfigured(_)
                | ApiError::ProviderRequestFailed(_)
                | ApiError::ProviderAuthFailed(_)
                | ApiError::ProviderRateLimit(_)
                | ApiError::ProviderModelNotFound(_)
                | ApiError::EmptyResponse
                | ApiError::TruncatedResponse
        )
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
