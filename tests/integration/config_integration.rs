//! Integration tests for Configuration System

use crate::integration::test_utils::with_xdg_env;
use pageforge::cli::{Commands, RunContext};
use pageforge::config::{global_config_path, ConfigLoader, PageforgeConfig, ProviderType};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_global_config_path_follows_xdg() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let path = global_config_path().unwrap();
        assert_eq!(
            path,
            test_dir.path().join("xdg").join("pageforge").join("config.toml")
        );
    });
}

#[test]
fn test_environment_specific_workspace_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("site");
    std::fs::create_dir_all(workspace.join("config")).unwrap();
    std::fs::write(
        workspace.join("config").join("config.toml"),
        r#"
[provider]
provider_type = "ollama"
model = "llama3"

[storage]
pages_dir = "public/pages"
"#,
    )
    .unwrap();
    std::fs::write(
        workspace.join("config").join("production.toml"),
        "[server]\nport = 8088\n\n[generation]\nreview_enabled = false\n",
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || {
        std::env::set_var("PAGEFORGE_ENV", "production");
        let config = ConfigLoader::load(&workspace);
        std::env::remove_var("PAGEFORGE_ENV");
        config
    })
    .unwrap();

    assert_eq!(config.provider.provider_type, ProviderType::Ollama);
    assert_eq!(config.provider.model, "llama3");
    assert_eq!(config.server.port, 8088);
    assert!(!config.generation.review_enabled);
    assert_eq!(config.storage.pages_dir, PathBuf::from("public/pages"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_anthropic_key_fallback_and_masking() {
    let test_dir = TempDir::new().unwrap();
    let config_file = test_dir.path().join("pageforge.toml");
    std::fs::write(
        &config_file,
        "[provider]\nprovider_type = \"anthropic\"\nmodel = \"claude-3-haiku\"\n",
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || {
        let original = std::env::var("ANTHROPIC_API_KEY").ok();
        std::env::set_var("ANTHROPIC_API_KEY", "anthropic-secret");
        let config = ConfigLoader::load_from_file(&config_file);
        match original {
            Some(value) => std::env::set_var("ANTHROPIC_API_KEY", value),
            None => std::env::remove_var("ANTHROPIC_API_KEY"),
        }
        config
    })
    .unwrap();

    assert_eq!(config.provider.api_key.as_deref(), Some("anthropic-secret"));
    let shown = config.to_toml().unwrap();
    assert!(shown.contains("********"));
    assert!(!shown.contains("anthropic-secret"));
}

#[tokio::test]
async fn test_run_context_uses_configured_storage() {
    let test_dir = TempDir::new().unwrap();
    let mut config = PageforgeConfig::default();
    config.storage.pages_dir = PathBuf::from("public/pages");
    config.storage.metadata_file = PathBuf::from("data/index.json");

    let ctx = RunContext::from_config(test_dir.path().to_path_buf(), config).unwrap();
    assert!(test_dir.path().join("public/pages").is_dir());

    let listing = ctx
        .execute(&Commands::List {
            format: "text".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(listing, "No pages published yet.");

    let shown = ctx.execute(&Commands::Config).await.unwrap();
    assert!(shown.contains("pages_dir = \"public/pages\""));
}

#[test]
fn test_invalid_config_rejected_by_run_context() {
    let test_dir = TempDir::new().unwrap();
    let mut config = PageforgeConfig::default();
    config.harness.webdriver_url = "not a url".to_string();

    let err = RunContext::from_config(test_dir.path().to_path_buf(), config)
        .err()
        .unwrap();
    assert!(err.to_string().contains("Harness:"));
}
