//! Merge rules: defaults first, then each source overrides what it sets.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only the keys people most often override are seeded here; every other field
/// falls back to its serde default during deserialization.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000)?
        .set_default("generation.max_attempts", 5)?
        .set_default("harness.webdriver_url", "http://localhost:9515")?
        .set_default("storage.pages_dir", "pages")?
        .set_default("storage.metadata_file", "page_metadata.json")
}
