//! Shared test utilities for integration tests
//!
//! Fakes for the text-generation provider and the validation harness, a
//! throwaway workspace with page and metadata stores, and XDG isolation for
//! configuration tests.

use async_trait::async_trait;
use pageforge::error::ApiError;
use pageforge::generation::{GenerationConfig, PageGenerator};
use pageforge::harness::{ValidationHarness, ValidationOutcome};
use pageforge::prompts::{PromptTemplates, Template};
use pageforge::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, TokenUsage,
};
use pageforge::store::{MetadataStore, PageStore};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// A complete page that passes every text check
pub const ALERT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Alert</title>
</head>
<body>
<button onclick="alert('Hello!')">Show alert</button>
</body>
</html>"#;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with `XDG_CONFIG_HOME` and `HOME` pointed into `test_dir`
///
/// The original values are restored afterwards, even when `f` panics.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    struct Restore(Vec<(&'static str, Option<String>)>);
    impl Drop for Restore {
        fn drop(&mut self) {
            for (key, value) in &self.0 {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
    let _restore = Restore(
        ["XDG_CONFIG_HOME", "HOME"]
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect(),
    );

    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&home).unwrap();
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().join("xdg"));
    std::env::set_var("HOME", &home);

    f()
}

/// Temporary workspace with page and metadata stores
pub struct Workspace {
    pub dir: TempDir,
    pub pages: Arc<PageStore>,
    pub metadata: Arc<MetadataStore>,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pages = Arc::new(PageStore::new(dir.path().join("pages")).unwrap());
        let metadata = Arc::new(MetadataStore::open(dir.path().join("page_metadata.json")).unwrap());
        Self {
            dir,
            pages,
            metadata,
        }
    }

    pub fn generator(
        &self,
        provider: Arc<dyn ModelProviderClient>,
        harness: Arc<dyn ValidationHarness>,
    ) -> PageGenerator {
        PageGenerator::new(
            provider,
            harness,
            Arc::clone(&self.pages),
            Arc::clone(&self.metadata),
            PromptTemplates::embedded(),
            GenerationConfig::default(),
        )
    }

    /// Files currently present in the pages directory
    pub fn page_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.pages.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// What the fake author sends back for one drafting call
#[derive(Debug, Clone)]
pub enum Draft {
    Page(String),
    Empty,
    RateLimited,
}

/// Fake provider that drafts from a script and always answers reviews with `FALSE`
///
/// Drafting calls are told apart from review calls by their system message.
/// Once the script runs out every draft is [`ALERT_PAGE`].
pub struct FakeProvider {
    review_system: String,
    drafts: Mutex<VecDeque<Draft>>,
    draft_requests: Mutex<Vec<String>>,
    review_calls: Mutex<usize>,
    delay: Duration,
}

impl FakeProvider {
    pub fn new(drafts: Vec<Draft>) -> Arc<Self> {
        Self::with_delay(drafts, Duration::ZERO)
    }

    /// Every drafting call sleeps for `delay` first
    pub fn with_delay(drafts: Vec<Draft>, delay: Duration) -> Arc<Self> {
        let review_system = PromptTemplates::embedded()
            .render(Template::ReviewSystem, &[])
            .unwrap();
        Arc::new(Self {
            review_system,
            drafts: Mutex::new(drafts.into()),
            draft_requests: Mutex::new(Vec::new()),
            review_calls: Mutex::new(0),
            delay,
        })
    }

    /// User messages of every drafting call, in order
    pub fn draft_requests(&self) -> Vec<String> {
        self.draft_requests.lock().unwrap().clone()
    }

    pub fn review_calls(&self) -> usize {
        *self.review_calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelProviderClient for FakeProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        let is_review = messages
            .first()
            .map(|m| m.content == self.review_system)
            .unwrap_or(false);
        if is_review {
            *self.review_calls.lock().unwrap() += 1;
            return Ok(reply("FALSE"));
        }

        let request = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.draft_requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let draft = self
            .drafts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Draft::Page(ALERT_PAGE.to_string()));
        match draft {
            Draft::Page(body) => Ok(reply(&body)),
            Draft::Empty => Ok(reply("")),
            Draft::RateLimited => Err(ApiError::ProviderRateLimit("try again later".to_string())),
        }
    }

    fn provider_name(&self) -> &str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

fn reply(content: &str) -> CompletionResponse {
    CompletionResponse {
        content: content.to_string(),
        model: "fake-model".to_string(),
        usage: TokenUsage::default(),
        finish_reason: Some("stop".to_string()),
    }
}

/// Harness returning scripted outcomes, then passing everything
pub struct FakeHarness {
    outcomes: Mutex<VecDeque<ValidationOutcome>>,
    seen: Mutex<Vec<String>>,
}

impl FakeHarness {
    pub fn passing() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(outcomes: Vec<ValidationOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ValidationHarness for FakeHarness {
    async fn test_page(&self, body: &str) -> ValidationOutcome {
        self.seen.lock().unwrap().push(body.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ValidationOutcome::pass)
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition().await
}
