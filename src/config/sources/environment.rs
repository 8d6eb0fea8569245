//! Environment source: PAGEFORGE__SECTION__KEY overrides `section.key`

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "PAGEFORGE";

/// Add the environment source; it overrides every file layer.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}

/// Credentials read from the conventional provider variables when the config leaves them empty
pub fn provider_key_fallback(provider_type: crate::provider::ProviderType) -> Option<String> {
    use crate::provider::ProviderType;
    let var = match provider_type {
        ProviderType::OpenAI => "OPENAI_API_KEY",
        ProviderType::Anthropic => "ANTHROPIC_API_KEY",
        ProviderType::Ollama => return None,
    };
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}
