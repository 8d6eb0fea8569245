//! Integration tests for the browser harness against a fake WebDriver server
//!
//! The fake driver really fetches the URL it is sent, so these tests also
//! cover the front-end serving the throwaway validation slot.

use crate::integration::test_utils::{Workspace, ALERT_PAGE};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use pageforge::harness::{BrowserHarness, HarnessConfig, ValidationHarness};
use pageforge::queue::PageQueue;
use pageforge::server::{self, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const BROKEN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body><script>throw new Error("boom");</script></body>
</html>"#;

const SLOW_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body><img src="/never-finishes.png" alt="SLOW_LOAD"></body>
</html>"#;

#[derive(Default)]
struct FakeDriver {
    http: reqwest::Client,
    /// Only answer the legacy `/log` endpoint
    legacy_log: bool,
    sessions_created: AtomicUsize,
    sessions_deleted: AtomicUsize,
    visited: Mutex<Vec<(String, u16, String)>>,
}

impl FakeDriver {
    fn last_body(&self) -> String {
        self.visited
            .lock()
            .unwrap()
            .last()
            .map(|(_, _, body)| body.clone())
            .unwrap_or_default()
    }

    fn browser_log(&self) -> Value {
        let mut entries = vec![json!({
            "level": "INFO",
            "message": "console-api 1:1 \"ready\"",
            "timestamp": 1
        })];
        if self.last_body().contains("throw new Error") {
            entries.push(json!({
                "level": "SEVERE",
                "message": "Uncaught Error: boom",
                "timestamp": 2
            }));
        }
        json!({ "value": entries })
    }
}

type Reply = (StatusCode, Json<Value>);

fn ok_null() -> Reply {
    (StatusCode::OK, Json(json!({ "value": null })))
}

async fn new_session(State(driver): State<Arc<FakeDriver>>) -> Reply {
    let n = driver.sessions_created.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({ "value": { "sessionId": format!("session-{}", n), "capabilities": {} } })),
    )
}

async fn set_timeouts(Path(_id): Path<String>) -> Reply {
    ok_null()
}

async fn navigate(
    State(driver): State<Arc<FakeDriver>>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    let url = body["url"].as_str().unwrap_or_default().to_string();
    let (status, text) = match driver.http.get(&url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            (status, response.text().await.unwrap_or_default())
        }
        Err(_) => (0, String::new()),
    };
    let slow = text.contains("SLOW_LOAD");
    driver.visited.lock().unwrap().push((url, status, text));

    if slow {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "value": { "error": "timeout", "message": "timeout: Timed out receiving message from renderer" } })),
        );
    }
    ok_null()
}

async fn se_log(State(driver): State<Arc<FakeDriver>>, Path(_id): Path<String>) -> Reply {
    if driver.legacy_log {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "value": { "error": "unknown command", "message": "unknown command: session/se/log" } })),
        );
    }
    (StatusCode::OK, Json(driver.browser_log()))
}

async fn legacy_log(State(driver): State<Arc<FakeDriver>>, Path(_id): Path<String>) -> Reply {
    (StatusCode::OK, Json(driver.browser_log()))
}

async fn delete_session(State(driver): State<Arc<FakeDriver>>, Path(_id): Path<String>) -> Reply {
    driver.sessions_deleted.fetch_add(1, Ordering::SeqCst);
    ok_null()
}

async fn spawn_driver(driver: Arc<FakeDriver>) -> String {
    let app = Router::new()
        .route("/session", post(new_session))
        .route("/session/{id}/timeouts", post(set_timeouts))
        .route("/session/{id}/url", post(navigate))
        .route("/session/{id}/se/log", post(se_log))
        .route("/session/{id}/log", post(legacy_log))
        .route("/session/{id}", delete(delete_session))
        .with_state(driver);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct Rig {
    ws: Workspace,
    driver: Arc<FakeDriver>,
    harness: BrowserHarness,
}

async fn rig(legacy_log: bool) -> Rig {
    let ws = Workspace::new();
    let driver = Arc::new(FakeDriver {
        legacy_log,
        ..FakeDriver::default()
    });
    let webdriver_url = spawn_driver(Arc::clone(&driver)).await;

    let state = AppState {
        pages: Arc::clone(&ws.pages),
        metadata: Arc::clone(&ws.metadata),
        queue: PageQueue::default(),
        provider: None,
    };
    let listener = server::bind("127.0.0.1", 0).await.unwrap();
    let (addr, _) = server::spawn(listener, state).unwrap();

    let config = HarnessConfig {
        webdriver_url,
        settle_ms: 0,
        ..HarnessConfig::default()
    };
    let harness =
        BrowserHarness::new(config, Arc::clone(&ws.pages), format!("http://{}", addr)).unwrap();
    Rig {
        ws,
        driver,
        harness,
    }
}

#[tokio::test]
async fn test_clean_page_passes_and_slot_is_removed() {
    let rig = rig(false).await;

    let outcome = rig.harness.test_page(ALERT_PAGE).await;

    assert!(outcome.passed, "unexpected failure: {:?}", outcome.reason);
    let visited = rig.driver.visited.lock().unwrap().clone();
    assert_eq!(visited.len(), 1);
    let (url, status, body) = &visited[0];
    assert!(url.contains("/pages/test_"), "visited {}", url);
    assert_eq!(*status, 200);
    assert_eq!(body, ALERT_PAGE);

    assert_eq!(rig.driver.sessions_deleted.load(Ordering::SeqCst), 1);
    assert!(rig.ws.page_files().is_empty());
}

#[tokio::test]
async fn test_console_errors_fail_validation() {
    let rig = rig(false).await;

    let outcome = rig.harness.test_page(BROKEN_PAGE).await;

    assert!(!outcome.passed);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("JavaScript errors: Uncaught Error: boom")
    );
    assert!(rig.ws.page_files().is_empty());
}

#[tokio::test]
async fn test_load_timeout_reported_and_session_closed() {
    let rig = rig(false).await;

    let outcome = rig.harness.test_page(SLOW_PAGE).await;

    assert!(!outcome.passed);
    assert_eq!(outcome.reason.as_deref(), Some("Page load timeout"));
    assert_eq!(rig.driver.sessions_deleted.load(Ordering::SeqCst), 1);
    assert!(rig.ws.page_files().is_empty());
}

#[tokio::test]
async fn test_text_check_failure_skips_browser() {
    let rig = rig(false).await;

    let outcome = rig
        .harness
        .test_page("<!DOCTYPE html><html><head></head><body></body></html>")
        .await;

    assert_eq!(outcome.reason.as_deref(), Some("Missing meta charset declaration"));
    assert_eq!(rig.driver.sessions_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_legacy_log_endpoint_fallback() {
    let rig = rig(true).await;

    let outcome = rig.harness.test_page(BROKEN_PAGE).await;

    assert_eq!(
        outcome.reason.as_deref(),
        Some("JavaScript errors: Uncaught Error: boom")
    );
}

#[tokio::test]
async fn test_unreachable_driver_fails_with_browser_error() {
    let ws = Workspace::new();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = HarnessConfig {
        webdriver_url: format!("http://127.0.0.1:{}", port),
        settle_ms: 0,
        ..HarnessConfig::default()
    };
    let harness =
        BrowserHarness::new(config, Arc::clone(&ws.pages), "http://127.0.0.1:1").unwrap();

    let outcome = harness.test_page(ALERT_PAGE).await;

    assert!(!outcome.passed);
    assert!(outcome
        .reason
        .unwrap()
        .starts_with("Browser error: WebDriver unreachable"));
    assert!(ws.page_files().is_empty());
}
