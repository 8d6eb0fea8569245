//! Configuration System
//!
//! Layered configuration: built-in defaults, a global file, workspace files and
//! `PAGEFORGE__SECTION__KEY` environment overrides, deserialized into one
//! strongly typed [`PageforgeConfig`].

use crate::error::ApiError;
use crate::generation::GenerationConfig;
use crate::harness::HarnessConfig;
use crate::logging::LoggingConfig;
use crate::queue::QueueConfig;
use crate::server::ServerConfig;
use crate::store::StorageConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageforgeConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub harness: HarnessConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String),
    Generation(String),
    Harness(String),
    Server(String),
    Storage(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Harness(msg) => write!(f, "Harness: {}", msg),
            ValidationError::Server(msg) => write!(f, "Server: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PageforgeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }
        if let Err(e) = self.harness.validate() {
            errors.push(ValidationError::Harness(e));
        }
        if let Err(e) = self.server.validate() {
            errors.push(ValidationError::Server(e));
        }
        if self.storage.pages_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Storage("pages_dir cannot be empty".to_string()));
        }
        if self.storage.metadata_file.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "metadata_file cannot be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one error
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    /// Base URL the browser uses to load candidates
    ///
    /// An explicit `harness.frontend_url` wins; otherwise the server's own
    /// address, with a wildcard bind mapped to loopback.
    pub fn frontend_url(&self) -> String {
        if let Some(url) = &self.harness.frontend_url {
            return url.trim_end_matches('/').to_string();
        }
        let host = match self.server.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
            host => host,
        };
        format!("http://{}:{}", host, self.server.port)
    }

    /// Resolve a configured path against the workspace root
    pub fn resolve_path(workspace_root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            workspace_root.join(path)
        }
    }

    /// Effective configuration as TOML, with credentials masked
    pub fn to_toml(&self) -> Result<String, ApiError> {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
    }
}
