//! Multi-attempt page generation
//!
//! One attempt is: author → self-review → (repair) → normalize → validate.
//! Only a validated candidate is published, and it is published together with
//! its metadata record or not at all.

use super::normalize::{normalize_document, strip_code_fence};
use super::review::ReviewVerdict;
use super::{GenerationConfig, GenerationFailure, PageCreator};
use crate::error::{ApiError, StorageError};
use crate::harness::checks::starts_with_marker;
use crate::harness::ValidationHarness;
use crate::prompts::{PromptTemplates, Template};
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::store::{MetadataStore, PageName, PageStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a single attempt did not produce a page
#[derive(Debug)]
enum AttemptFailure {
    /// The text-generation service failed or returned an unusable reply
    Service(ApiError),
    /// The candidate was produced but did not validate
    Rejected(String),
    /// Templates or stores failed
    Internal(ApiError),
}

impl AttemptFailure {
    fn reason(&self) -> String {
        match self {
            AttemptFailure::Service(e) | AttemptFailure::Internal(e) => e.to_string(),
            AttemptFailure::Rejected(reason) => reason.clone(),
        }
    }
}

impl From<StorageError> for AttemptFailure {
    fn from(err: StorageError) -> Self {
        AttemptFailure::Internal(err.into())
    }
}

/// Drives the generate/review/repair/validate loop for one prompt at a time
pub struct PageGenerator {
    provider: Arc<dyn ModelProviderClient>,
    harness: Arc<dyn ValidationHarness>,
    pages: Arc<PageStore>,
    metadata: Arc<MetadataStore>,
    templates: PromptTemplates,
    config: GenerationConfig,
}

impl PageGenerator {
    pub fn new(
        provider: Arc<dyn ModelProviderClient>,
        harness: Arc<dyn ValidationHarness>,
        pages: Arc<PageStore>,
        metadata: Arc<MetadataStore>,
        templates: PromptTemplates,
        config: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            harness,
            pages,
            metadata,
            templates,
            config,
        }
    }

    /// Create, validate and publish a page for `prompt`
    pub async fn create_page(&self, prompt: &str) -> Result<PageName, GenerationFailure> {
        let max_attempts = self.config.max_attempts;
        // Last validation reason, fed back to the author on the next attempt
        let mut carried_reason: Option<String> = None;
        let mut last_error = String::from("no attempts were made");

        for attempt in 1..=max_attempts {
            debug!(attempt, max_attempts, "Starting generation attempt");

            match self.attempt(prompt, carried_reason.as_deref()).await {
                Ok(name) => {
                    info!(attempt, page_name = %name, "Page created");
                    return Ok(name);
                }
                Err(AttemptFailure::Rejected(reason)) => {
                    warn!(attempt, max_attempts, reason = %reason, "Candidate failed validation");
                    last_error = reason.clone();
                    carried_reason = Some(reason);
                }
                Err(failure @ AttemptFailure::Service(_)) => {
                    error!(attempt, max_attempts, error = %failure.reason(), "Text-generation service error");
                    last_error = failure.reason();
                }
                Err(failure @ AttemptFailure::Internal(_)) => {
                    error!(attempt, max_attempts, error = %failure.reason(), "Generation attempt failed");
                    last_error = failure.reason();
                }
            }
        }

        let failure = GenerationFailure::exhausted(max_attempts, &last_error);
        error!(reason = %failure.reason, "Page generation gave up");
        Err(failure)
    }

    async fn attempt(
        &self,
        prompt: &str,
        carried_reason: Option<&str>,
    ) -> Result<PageName, AttemptFailure> {
        let request = match carried_reason {
            None => self
                .templates
                .render(Template::GenerateUser, &[("prompt", prompt)]),
            Some(reason) => self.templates.render(
                Template::RetryUser,
                &[("prompt", prompt), ("error", reason)],
            ),
        }
        .map_err(AttemptFailure::Internal)?;
        let system = self
            .templates
            .render(Template::GenerateSystem, &[])
            .map_err(AttemptFailure::Internal)?;

        let draft = self
            .author(
                vec![ChatMessage::system(system), ChatMessage::user(request)],
                CompletionOptions::new(
                    self.config.generate_temperature,
                    self.config.generate_max_tokens,
                ),
            )
            .await
            .map_err(AttemptFailure::Service)?;

        let reviewed = if self.config.review_enabled {
            self.review_and_repair(prompt, draft).await?
        } else {
            draft
        };

        let candidate = normalize_document(&reviewed);
        let outcome = self.harness.test_page(&candidate).await;
        if !outcome.passed {
            return Err(AttemptFailure::Rejected(
                outcome
                    .reason
                    .unwrap_or_else(|| "Validation failed".to_string()),
            ));
        }

        Ok(self.publish(prompt, &candidate)?)
    }

    /// Request a page body; empty or truncated replies are errors
    async fn author(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, ApiError> {
        let response = self.provider.complete(messages, options).await?;
        if response.is_truncated() {
            return Err(ApiError::TruncatedResponse);
        }
        let body = strip_code_fence(&response.content);
        if body.is_empty() {
            return Err(ApiError::EmptyResponse);
        }
        Ok(body)
    }

    /// Ask for a verdict and apply at most one repair pass
    async fn review_and_repair(&self, prompt: &str, draft: String) -> Result<String, AttemptFailure> {
        let system = self
            .templates
            .render(Template::ReviewSystem, &[])
            .map_err(AttemptFailure::Internal)?;
        let user = self
            .templates
            .render(Template::ReviewUser, &[("prompt", prompt), ("page", &draft)])
            .map_err(AttemptFailure::Internal)?;

        let reply = self
            .provider
            .complete(
                vec![ChatMessage::system(system), ChatMessage::user(user)],
                CompletionOptions::new(
                    self.config.review_temperature,
                    self.config.review_max_tokens,
                ),
            )
            .await
            .map_err(AttemptFailure::Service)?;

        let verdict = ReviewVerdict::parse(&reply.content);
        let Some(issues) = verdict.issues() else {
            if verdict == ReviewVerdict::Unparsable {
                debug!("Review verdict unparsable; treating as no issues");
            }
            return Ok(draft);
        };
        debug!(issues, "Review found issues");

        let repair_system = self
            .templates
            .render(
                Template::RepairSystem,
                &[("prompt", prompt), ("issues", issues)],
            )
            .map_err(AttemptFailure::Internal)?;
        let repaired = self
            .provider
            .complete(
                vec![
                    ChatMessage::system(repair_system),
                    ChatMessage::user(draft.clone()),
                ],
                CompletionOptions::new(
                    self.config.repair_temperature,
                    self.config.repair_max_tokens,
                ),
            )
            .await
            .map_err(AttemptFailure::Service)?;

        let fixed = strip_code_fence(&repaired.content);
        if repaired.is_truncated() || !starts_with_marker(&fixed) {
            debug!("Repair reply not a complete document; keeping the draft");
            return Ok(draft);
        }
        Ok(fixed)
    }

    /// Write the page and its metadata; neither survives without the other
    fn publish(&self, prompt: &str, body: &str) -> Result<PageName, StorageError> {
        let name = self.pages.publish(body)?;
        if let Err(e) = self.metadata.record(&name, prompt) {
            if let Err(remove_err) = self.pages.remove(&name) {
                warn!(page_name = %name, error = %remove_err, "Failed to remove unindexed page");
            }
            return Err(e);
        }
        Ok(name)
    }
}

#[async_trait]
impl PageCreator for PageGenerator {
    async fn create_page(&self, prompt: &str) -> Result<PageName, GenerationFailure> {
        PageGenerator::create_page(self, prompt).await
    }
}
