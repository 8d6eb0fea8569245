//! Route handlers

use super::index::render_index;
use super::AppState;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::store::{catalog, PageName};
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_PAGE_MAX_TOKENS: u32 = 4096;

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

fn require_provider(state: &AppState) -> Result<Arc<dyn ModelProviderClient>, Response> {
    state.provider.clone().ok_or_else(|| {
        failure(
            StatusCode::SERVICE_UNAVAILABLE,
            "Text-generation provider is not configured",
        )
    })
}

pub async fn index(State(state): State<AppState>) -> Response {
    match catalog(&state.pages, &state.metadata) {
        Ok(entries) => Html(render_index(&entries, state.queue.status())).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list pages");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list pages").into_response()
        }
    }
}

pub async fn serve_page(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let not_found = || (StatusCode::NOT_FOUND, "Page not found").into_response();
    let Ok(name) = PageName::parse(&name) else {
        return not_found();
    };
    match state.pages.read(&name) {
        Ok(Some(body)) => Html(body).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            error!(page_name = %name, error = %e, "Failed to read page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read page").into_response()
        }
    }
}

pub async fn list_pages(State(state): State<AppState>) -> Response {
    match catalog(&state.pages, &state.metadata) {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn queue_status(State(state): State<AppState>) -> Response {
    Json(state.queue.status()).into_response()
}

/// Inbound-message webhook; always answers 200 so the sender never retries
pub async fn sms_webhook(
    State(state): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> (StatusCode, &'static str) {
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(rejection) => {
            error!(error = %rejection, "Webhook payload could not be read");
            return (StatusCode::OK, "OK");
        }
    };

    let message = fields.get("MESSAGE").map(|m| m.trim()).unwrap_or("");
    let from = fields.get("FROM").map(String::as_str).unwrap_or("unknown");
    if message.is_empty() {
        error!(from, "Empty message received from webhook");
        return (StatusCode::OK, "OK");
    }

    let position = state.queue.enqueue(message);
    info!(from, queue_position = position, text = %message, "Message received");
    (StatusCode::OK, "OK")
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
}

/// Run one prompt through the work queue and wait for the result
pub async fn generate_page(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Prompt must not be empty");
    }

    match state.queue.enqueue_and_wait(prompt).await {
        Ok(page_name) => Json(json!({ "success": true, "page_name": page_name })).into_response(),
        Err(failure_reason) => {
            warn!(reason = %failure_reason.reason, "Generation request failed");
            failure(StatusCode::BAD_REQUEST, failure_reason.reason)
        }
    }
}

/// Shape the page asked the model to answer in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Text,
    List,
    Json,
}

impl Expect {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("list") => Expect::List,
            Some(v) if v.eq_ignore_ascii_case("json") => Expect::Json,
            _ => Expect::Text,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Expect::Text => "A single text string",
            Expect::List => "A JSON array of strings",
            Expect::Json => "A JSON object matching the provided schema",
        }
    }

    /// Shape the raw reply; the error is the message returned to the page
    fn shape(self, reply: &str) -> Result<Value, &'static str> {
        match self {
            Expect::Text => Ok(Value::String(reply.to_string())),
            Expect::Json => serde_json::from_str(reply).map_err(|_| "Invalid JSON response"),
            Expect::List => match serde_json::from_str(reply) {
                Ok(list @ Value::Array(_)) => Ok(list),
                _ => Err("Invalid list response"),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InteractRequest {
    pub role: Option<String>,
    pub prompt: Option<String>,
    pub expect: Option<String>,
    pub temperature: Option<f32>,
}

/// Structured model proxy used by generated pages
pub async fn llm_interact(
    State(state): State<AppState>,
    body: Result<Json<InteractRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let (Some(role), Some(prompt)) = (
        request.role.filter(|r| !r.trim().is_empty()),
        request.prompt.filter(|p| !p.trim().is_empty()),
    ) else {
        return failure(StatusCode::BAD_REQUEST, "Missing required fields");
    };
    let provider = match require_provider(&state) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    let expect = Expect::parse(request.expect.as_deref());
    let system = format!(
        "You are {}.\nYou must respond in this exact format:\n{}",
        role,
        expect.instruction()
    );
    let options = CompletionOptions {
        temperature: Some(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
        max_tokens: None,
    };

    let reply = match provider
        .complete(vec![ChatMessage::system(system), ChatMessage::user(prompt)], options)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, "Model interaction failed");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    match expect.shape(reply.content.trim()) {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(message) => failure(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

#[derive(Debug, Deserialize)]
pub struct PageLlmRequest {
    pub role: Option<String>,
    pub prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Plain-text model proxy used by generated pages
pub async fn llm_page(
    State(state): State<AppState>,
    body: Result<Json<PageLlmRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let provider = match require_provider(&state) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    let role = request
        .role
        .unwrap_or_else(|| "a helpful AI assistant.".to_string());
    let messages = vec![
        ChatMessage::system(format!("You are {}", role)),
        ChatMessage::user(request.prompt.unwrap_or_default()),
    ];
    let options = CompletionOptions::new(
        request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        request.max_tokens.unwrap_or(DEFAULT_PAGE_MAX_TOKENS),
    );

    match provider.complete(messages, options).await {
        Ok(reply) => Json(json!({ "success": true, "data": reply.content.trim() })).into_response(),
        Err(e) => {
            error!(error = %e, "Page model call failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
