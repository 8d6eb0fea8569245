//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::parse::{Commands, TemplateCommands};
use crate::cli::presentation::{format_page_list_json, format_page_list_text, format_ping_result};
use crate::config::{ConfigLoader, PageforgeConfig};
use crate::console::Console;
use crate::error::{ApiError, StorageError};
use crate::generation::{GenerationFailure, PageCreator, PageGenerator};
use crate::harness::BrowserHarness;
use crate::prompts::PromptTemplates;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient, ProviderFactory};
use crate::queue::PageQueue;
use crate::server::{self, AppState};
use crate::store::{catalog, MetadataStore, PageName, PageStore};
use async_trait::async_trait;
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace, resolved config and the stores.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: PageforgeConfig,
    pages: Arc<PageStore>,
    metadata: Arc<MetadataStore>,
}

/// Everything a running pipeline needs, wired together
struct Pipeline {
    queue: PageQueue,
    state: AppState,
}

/// Worker stand-in for a front-end started without model credentials
struct ProviderUnavailable {
    reason: String,
}

#[async_trait]
impl PageCreator for ProviderUnavailable {
    async fn create_page(&self, _prompt: &str) -> Result<PageName, GenerationFailure> {
        Err(GenerationFailure {
            reason: format!("No model provider configured: {}", self.reason),
            attempts: 0,
        })
    }
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::from_config(workspace_root, config)
    }

    /// Create run context from an already loaded configuration
    pub fn from_config(workspace_root: PathBuf, config: PageforgeConfig) -> Result<Self, ApiError> {
        config.ensure_valid()?;

        let pages_dir = PageforgeConfig::resolve_path(&workspace_root, &config.storage.pages_dir);
        let metadata_file =
            PageforgeConfig::resolve_path(&workspace_root, &config.storage.metadata_file);
        let pages = Arc::new(PageStore::new(&pages_dir)?);
        let metadata = Arc::new(MetadataStore::open(&metadata_file)?);

        Ok(Self {
            workspace_root,
            config,
            pages,
            metadata,
        })
    }

    pub fn config(&self) -> &PageforgeConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Serve {
                no_console,
                host,
                port,
            } => self.handle_serve(*no_console, host.clone(), *port).await,
            Commands::Generate { prompt } => self.handle_generate(prompt).await,
            Commands::List { format } => self.handle_list(format),
            Commands::Show { name } => self.handle_show(name),
            Commands::Config => self.config.to_toml(),
            Commands::Ping => self.handle_ping().await,
            Commands::Templates { command } => match command {
                TemplateCommands::Export { dir, force } => {
                    self.handle_templates_export(dir.as_deref(), *force)
                }
            },
        }
    }

    async fn handle_serve(
        &self,
        no_console: bool,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<String, ApiError> {
        let mut config = self.config.clone();
        if let Some(host) = host {
            config.server.host = host;
        }
        if let Some(port) = port {
            config.server.port = port;
        }
        config.ensure_valid()?;

        let listener = server::bind(&config.server.host, config.server.port).await?;
        let frontend_url = config.frontend_url();
        let pipeline = self.serving_pipeline(&config, &frontend_url)?;
        let queue = pipeline.queue.clone();

        if no_console {
            info!(url = %frontend_url, "Serving without console; press Ctrl-C to stop");
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };
            server::serve(listener, pipeline.state, shutdown).await?;
        } else {
            let (_, server_task) = server::spawn(listener, pipeline.state)?;
            let color = config.logging.color && std::io::stdout().is_terminal();
            let console = Console::new(queue.clone(), frontend_url, color);
            let result = console
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await;
            server_task.abort();
            result?;
        }

        let pending = queue.status().queue_depth;
        if pending > 0 {
            warn!(queue_depth = pending, "Prompts left unprocessed at shutdown");
        }
        queue.stop().await?;
        Ok(String::new())
    }

    async fn handle_generate(&self, prompt: &str) -> Result<String, ApiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::GenerationFailed(
                "Prompt must not be empty".to_string(),
            ));
        }

        // The harness loads candidates over HTTP; without an external front-end,
        // serve the pages directory on an ephemeral loopback port.
        let (frontend_url, listener) = match &self.config.harness.frontend_url {
            Some(url) => (url.trim_end_matches('/').to_string(), None),
            None => {
                let listener = server::bind("127.0.0.1", 0).await?;
                let addr = listener.local_addr().map_err(|e| {
                    ApiError::ConfigError(format!("Listener has no local address: {}", e))
                })?;
                (loopback_url(addr), Some(listener))
            }
        };

        let pipeline = self.build_pipeline(&self.config, &frontend_url)?;
        let server_task = match listener {
            Some(listener) => Some(server::spawn(listener, pipeline.state.clone())?.1),
            None => None,
        };

        let outcome = pipeline.queue.enqueue_and_wait(prompt).await;

        pipeline.queue.stop().await?;
        if let Some(task) = server_task {
            task.abort();
        }

        match outcome {
            Ok(name) => Ok(format!(
                "Created {} ({})",
                name,
                self.pages.path_for(&name).display()
            )),
            Err(failure) => Err(ApiError::GenerationFailed(failure.reason)),
        }
    }

    fn handle_list(&self, format: &str) -> Result<String, ApiError> {
        let entries = catalog(&self.pages, &self.metadata)?;
        match format {
            "json" => format_page_list_json(&entries),
            "text" => Ok(format_page_list_text(&entries)),
            other => Err(ApiError::ConfigError(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }

    fn handle_show(&self, name: &str) -> Result<String, ApiError> {
        let name = PageName::parse(name.trim_end_matches(".html"))?;
        self.pages
            .read(&name)?
            .ok_or_else(|| StorageError::PageNotFound(name.to_string()).into())
    }

    async fn handle_ping(&self) -> Result<String, ApiError> {
        let provider = ProviderFactory::from_config(&self.config.provider)?;
        let response = provider
            .complete(
                vec![ChatMessage::user("Say hello!")],
                CompletionOptions::new(0.7, 50),
            )
            .await?;
        Ok(format_ping_result(
            provider.provider_name(),
            &response.model,
            response.content.trim(),
        ))
    }

    fn handle_templates_export(&self, dir: Option<&Path>, force: bool) -> Result<String, ApiError> {
        let target = dir
            .map(Path::to_path_buf)
            .or_else(|| self.config.generation.templates_dir.clone())
            .unwrap_or_else(|| PathBuf::from("prompts"));
        let target = PageforgeConfig::resolve_path(&self.workspace_root, &target);

        let written = PromptTemplates::export_defaults(&target, force)?;
        if written.is_empty() {
            return Ok(format!(
                "All templates already exist in {} (use --force to overwrite)",
                target.display()
            ));
        }
        let mut out = format!("Wrote {} template(s):\n", written.len());
        for path in written {
            out.push_str(&format!("  {}\n", path.display()));
        }
        Ok(out.trim_end().to_string())
    }

    /// Pipeline for `serve`; missing credentials leave a browse-only front-end
    fn serving_pipeline(
        &self,
        config: &PageforgeConfig,
        frontend_url: &str,
    ) -> Result<Pipeline, ApiError> {
        let reason = match self.build_pipeline(config, frontend_url) {
            Err(ApiError::ProviderNotConfigured(reason)) => reason,
            other => return other,
        };
        warn!(%reason, "Model provider not configured; prompts will be rejected");

        let queue = PageQueue::new(config.queue.clone());
        queue.start(Arc::new(ProviderUnavailable { reason }))?;
        let state = AppState {
            pages: Arc::clone(&self.pages),
            metadata: Arc::clone(&self.metadata),
            queue: queue.clone(),
            provider: None,
        };
        Ok(Pipeline { queue, state })
    }

    /// Wire provider, harness, generator and worker for one run
    fn build_pipeline(
        &self,
        config: &PageforgeConfig,
        frontend_url: &str,
    ) -> Result<Pipeline, ApiError> {
        let provider: Arc<dyn ModelProviderClient> =
            Arc::from(ProviderFactory::from_config(&config.provider)?);
        let harness = BrowserHarness::new(
            config.harness.clone(),
            Arc::clone(&self.pages),
            frontend_url,
        )?;

        let templates_dir = config
            .generation
            .templates_dir
            .as_ref()
            .map(|dir| PageforgeConfig::resolve_path(&self.workspace_root, dir));
        let templates = PromptTemplates::load(templates_dir.as_deref())?;

        let generator = PageGenerator::new(
            Arc::clone(&provider),
            Arc::new(harness),
            Arc::clone(&self.pages),
            Arc::clone(&self.metadata),
            templates,
            config.generation.clone(),
        );

        let queue = PageQueue::new(config.queue.clone());
        queue.start(Arc::new(generator))?;
        info!(
            provider = provider.provider_name(),
            model = provider.model_name(),
            frontend_url,
            "Generation pipeline ready"
        );

        let state = AppState {
            pages: Arc::clone(&self.pages),
            metadata: Arc::clone(&self.metadata),
            queue: queue.clone(),
            provider: Some(provider),
        };
        Ok(Pipeline { queue, state })
    }
}

fn loopback_url(addr: SocketAddr) -> String {
    format!("http://127.0.0.1:{}", addr.port())
}
