//! HTTP front-end
//!
//! Serves the page index and published pages, feeds the work queue from the
//! inbound-message webhook and the generation API, and proxies simple model
//! calls for generated pages. The validation harness also loads candidates
//! through this server.

pub mod index;
pub mod routes;

use crate::error::ApiError;
use crate::provider::ModelProviderClient;
use crate::queue::PageQueue;
use crate::store::{MetadataStore, PageStore};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// `[server]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<PageStore>,
    pub metadata: Arc<MetadataStore>,
    pub queue: PageQueue,
    /// Backs the page-facing model proxy; those routes answer 503 without it
    pub provider: Option<Arc<dyn ModelProviderClient>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/pages/{name}", get(routes::serve_page))
        .route("/api/pages", get(routes::list_pages))
        .route("/api/queue/status", get(routes::queue_status))
        .route("/api/sms/webhook", post(routes::sms_webhook))
        .route("/api/llm/generate", post(routes::generate_page))
        .route("/api/llm/interact", post(routes::llm_interact))
        .route("/api/llm/page", post(routes::llm_page))
        .with_state(state)
}

pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ApiError> {
    let address = format!("{}:{}", host, port);
    TcpListener::bind(&address)
        .await
        .map_err(|e| ApiError::ConfigError(format!("Failed to bind {}: {}", address, e)))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP front-end listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::ConfigError(format!("HTTP server failed: {}", e)))
}

/// Serve on a background task; returns the bound address
pub fn spawn(listener: TcpListener, state: AppState) -> Result<(SocketAddr, JoinHandle<()>), ApiError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ApiError::ConfigError(format!("Listener has no local address: {}", e)))?;
    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state, std::future::pending()).await {
            error!(error = %e, "HTTP front-end stopped");
        }
    });
    Ok((addr, handle))
}
