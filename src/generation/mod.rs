//! Generation Orchestrator
//!
//! Turns one prompt into a published page: author, self-review, repair,
//! normalize and validate, with a bounded number of attempts.

pub mod normalize;
pub mod orchestrator;
pub mod review;

pub use normalize::{normalize_document, strip_code_fence};
pub use orchestrator::PageGenerator;
pub use review::ReviewVerdict;

use crate::store::PageName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Terminal failure for one prompt, after every attempt was used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct GenerationFailure {
    pub reason: String,
    pub attempts: usize,
}

impl GenerationFailure {
    pub fn exhausted(attempts: usize, last_error: &str) -> Self {
        Self {
            reason: format!(
                "Failed after {} attempts. Last error: {}",
                attempts, last_error
            ),
            attempts,
        }
    }
}

/// Anything that can turn a prompt into a published page
///
/// The worker only depends on this seam, so tests can count and order calls.
#[async_trait]
pub trait PageCreator: Send + Sync {
    async fn create_page(&self, prompt: &str) -> Result<PageName, GenerationFailure>;
}

/// `[generation]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_generate_temperature")]
    pub generate_temperature: f32,

    #[serde(default = "default_page_max_tokens")]
    pub generate_max_tokens: u32,

    /// Skip the self-review and repair passes entirely
    #[serde(default = "default_review_enabled")]
    pub review_enabled: bool,

    #[serde(default = "default_review_temperature")]
    pub review_temperature: f32,

    #[serde(default = "default_review_max_tokens")]
    pub review_max_tokens: u32,

    #[serde(default = "default_review_temperature")]
    pub repair_temperature: f32,

    #[serde(default = "default_page_max_tokens")]
    pub repair_max_tokens: u32,

    /// Directory of template overrides; embedded templates are used when unset
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

fn default_max_attempts() -> usize {
    5
}

fn default_generate_temperature() -> f32 {
    0.2
}

fn default_page_max_tokens() -> u32 {
    4096
}

fn default_review_enabled() -> bool {
    true
}

fn default_review_temperature() -> f32 {
    0.1
}

fn default_review_max_tokens() -> u32 {
    200
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            generate_temperature: default_generate_temperature(),
            generate_max_tokens: default_page_max_tokens(),
            review_enabled: default_review_enabled(),
            review_temperature: default_review_temperature(),
            review_max_tokens: default_review_max_tokens(),
            repair_temperature: default_review_temperature(),
            repair_max_tokens: default_page_max_tokens(),
            templates_dir: None,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        for (name, value) in [
            ("generate_temperature", self.generate_temperature),
            ("review_temperature", self.review_temperature),
            ("repair_temperature", self.repair_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 2.0, got {}", name, value));
            }
        }
        if self.generate_max_tokens == 0 || self.repair_max_tokens == 0 || self.review_max_tokens == 0 {
            return Err("max token limits must be greater than zero".to_string());
        }
        Ok(())
    }
}
