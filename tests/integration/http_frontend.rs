//! Integration tests for the HTTP front-end

use crate::integration::test_utils::{Draft, FakeHarness, FakeProvider, Workspace, ALERT_PAGE};
use async_trait::async_trait;
use pageforge::error::ApiError;
use pageforge::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, TokenUsage,
};
use pageforge::queue::{PageQueue, QueueConfig};
use pageforge::server::{self, AppState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Answers every call with a fixed reply and records what it was sent
struct CannedProvider {
    reply: String,
    calls: Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
}

impl CannedProvider {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelProviderClient for CannedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        self.calls.lock().unwrap().push((messages, options));
        Ok(CompletionResponse {
            content: self.reply.clone(),
            model: "canned".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "canned"
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

struct Frontend {
    ws: Workspace,
    queue: PageQueue,
    base: String,
    http: reqwest::Client,
}

async fn frontend(provider: Option<Arc<dyn ModelProviderClient>>) -> Frontend {
    let ws = Workspace::new();
    let queue = PageQueue::new(QueueConfig {
        idle_poll_ms: 10,
        cooldown_ms: 10,
    });
    let state = AppState {
        pages: Arc::clone(&ws.pages),
        metadata: Arc::clone(&ws.metadata),
        queue: queue.clone(),
        provider,
    };
    let listener = server::bind("127.0.0.1", 0).await.unwrap();
    let (addr, _) = server::spawn(listener, state).unwrap();
    Frontend {
        ws,
        queue,
        base: format!("http://{}", addr),
        http: reqwest::Client::new(),
    }
}

impl Frontend {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self.http.post(self.url(path)).json(&body).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_index_and_page_serving() {
    let fe = frontend(None).await;
    let name = fe.ws.pages.publish(ALERT_PAGE).unwrap();
    fe.ws.metadata.record(&name, "an alert <button>").unwrap();

    let index = fe.http.get(fe.url("/")).send().await.unwrap();
    assert_eq!(index.status().as_u16(), 200);
    let html = index.text().await.unwrap();
    assert!(html.contains(&format!("href=\"/pages/{}\"", name)));
    assert!(html.contains("an alert &lt;button&gt;"));

    let page = fe
        .http
        .get(fe.url(&format!("/pages/{}", name)))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status().as_u16(), 200);
    assert!(page.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(page.text().await.unwrap(), ALERT_PAGE);

    for missing in ["/pages/page_1_1000", "/pages/..%2Fpage_metadata"] {
        let response = fe.http.get(fe.url(missing)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 404, "{}", missing);
        assert_eq!(response.text().await.unwrap(), "Page not found");
    }
}

#[tokio::test]
async fn test_listing_and_queue_status() {
    let fe = frontend(None).await;
    let name = fe.ws.pages.publish(ALERT_PAGE).unwrap();
    fe.ws.metadata.record(&name, "listed").unwrap();
    fe.queue.enqueue("waiting");

    let pages: Value = fe
        .http
        .get(fe.url("/api/pages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pages[0]["name"], name.as_str());
    assert_eq!(pages[0]["prompt"], "listed");

    let status: Value = fe
        .http
        .get(fe.url("/api/queue/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status, json!({ "queue_depth": 1, "is_processing": false }));
}

#[tokio::test]
async fn test_webhook_enqueues_non_empty_messages() {
    let fe = frontend(None).await;

    let empty = fe
        .http
        .post(fe.url("/api/sms/webhook"))
        .form(&[("MESSAGE", "   "), ("FROM", "+15550100")])
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 200);
    assert_eq!(empty.text().await.unwrap(), "OK");
    assert_eq!(fe.queue.status().queue_depth, 0);

    let missing = fe
        .http
        .post(fe.url("/api/sms/webhook"))
        .form(&[("FROM", "+15550100")])
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 200);
    assert_eq!(fe.queue.status().queue_depth, 0);

    let real = fe
        .http
        .post(fe.url("/api/sms/webhook"))
        .form(&[("MESSAGE", "a countdown timer"), ("FROM", "+15550100")])
        .send()
        .await
        .unwrap();
    assert_eq!(real.status().as_u16(), 200);
    assert_eq!(fe.queue.status().queue_depth, 1);
}

#[tokio::test]
async fn test_generate_runs_through_queue() {
    let fe = frontend(None).await;
    let generator = fe
        .ws
        .generator(FakeProvider::new(vec![]), FakeHarness::passing());
    fe.queue.start(Arc::new(generator)).unwrap();

    let (status, body) = fe
        .post_json("/api/llm/generate", json!({ "prompt": "a button that shows an alert" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let name = body["page_name"].as_str().unwrap().to_string();
    assert_eq!(
        fe.ws.metadata.lookup(&name).prompt.as_deref(),
        Some("a button that shows an alert")
    );

    let (status, body) = fe.post_json("/api/llm/generate", json!({ "prompt": " " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);

    fe.queue.stop().await.unwrap();
}

#[tokio::test]
async fn test_generate_failure_is_reported() {
    let fe = frontend(None).await;
    let generator = fe
        .ws
        .generator(FakeProvider::new(vec![Draft::Empty; 5]), FakeHarness::passing());
    fe.queue.start(Arc::new(generator)).unwrap();

    let (status, body) = fe
        .post_json("/api/llm/generate", json!({ "prompt": "anything" }))
        .await;

    assert_eq!(status, 400);
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "Failed after 5 attempts. Last error: Provider returned an empty response"
        })
    );
    assert!(fe.ws.page_files().is_empty());
    fe.queue.stop().await.unwrap();
}

#[tokio::test]
async fn test_interact_validates_and_shapes_replies() {
    let list_provider = CannedProvider::new(r#"  ["red", "green"]  "#);
    let fe = frontend(Some(list_provider.clone() as Arc<dyn ModelProviderClient>)).await;

    let (status, body) = fe
        .post_json("/api/llm/interact", json!({ "prompt": "colors?" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) = fe
        .post_json(
            "/api/llm/interact",
            json!({ "role": "a color expert", "prompt": "two colors", "expect": "list" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true, "data": ["red", "green"] }));

    let calls = list_provider.calls.lock().unwrap().clone();
    let (messages, options) = &calls[0];
    assert!(messages[0].content.starts_with("You are a color expert."));
    assert!(messages[0].content.contains("A JSON array of strings"));
    assert_eq!(messages[1].content, "two colors");
    assert_eq!(options.temperature, Some(0.7));

    let text_fe = frontend(Some(CannedProvider::new("not json at all") as Arc<dyn ModelProviderClient>)).await;
    let (status, body) = text_fe
        .post_json(
            "/api/llm/interact",
            json!({ "role": "a parser", "prompt": "x", "expect": "json" }),
        )
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Invalid JSON response");
}

#[tokio::test]
async fn test_page_proxy_defaults_and_missing_provider() {
    let provider = CannedProvider::new("\n  Hello there!  \n");
    let fe = frontend(Some(provider.clone() as Arc<dyn ModelProviderClient>)).await;

    let (status, body) = fe
        .post_json("/api/llm/page", json!({ "prompt": "greet me" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true, "data": "Hello there!" }));

    let calls = provider.calls.lock().unwrap().clone();
    let (messages, options) = &calls[0];
    assert_eq!(messages[0].content, "You are a helpful AI assistant.");
    assert_eq!(options.max_tokens, Some(4096));

    let bare = frontend(None).await;
    let (status, body) = bare
        .post_json("/api/llm/page", json!({ "prompt": "greet me" }))
        .await;
    assert_eq!(status, 503);
    assert_eq!(body["success"], false);
}
