//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::PageforgeConfig;
use crate::error::ApiError;
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::Path;
use tracing::debug;

/// Builds a [`PageforgeConfig`] from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults → global file → workspace files → environment
    pub fn load(workspace_root: &Path) -> Result<PageforgeConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        Self::finish(builder)
    }

    /// Defaults → `path` → environment; the explicit file replaces the file layers
    pub fn load_from_file(path: &Path) -> Result<PageforgeConfig, ApiError> {
        if !path.is_file() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<PageforgeConfig, ApiError> {
        let mut config: PageforgeConfig = builder.build()?.try_deserialize()?;

        let key_missing = config
            .provider
            .api_key
            .as_deref()
            .map(|key| key.trim().is_empty())
            .unwrap_or(true);
        if key_missing {
            if let Some(key) = environment::provider_key_fallback(config.provider.provider_type) {
                debug!("Using provider key from the environment");
                config.provider.api_key = Some(key);
            }
        }
        Ok(config)
    }
}
