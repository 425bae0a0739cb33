//! Configuration for OpenAI-compatible providers.

use std::time::Duration;

use bridgebot_types::config::LlmConfig;

/// Connection settings for an [`super::OpenAiCompatibleProvider`].
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Human-readable provider name used in logs (e.g., "deepseek").
    pub provider_name: String,
    /// Base URL up to and including the version segment, without a trailing slash.
    pub base_url: String,
    /// Transport-level timeout for one completion call.
    pub timeout: Duration,
}

impl OpenAiCompatConfig {
    /// Settings from the `[llm]` section of the config file.
    pub fn from_llm_config(config: &LlmConfig) -> Self {
        Self {
            provider_name: provider_name_for(&config.base_url),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

/// DeepSeek default configuration.
///
/// Base URL: `https://api.deepseek.com/v1`
pub fn deepseek_defaults() -> OpenAiCompatConfig {
    OpenAiCompatConfig::from_llm_config(&LlmConfig::default())
}

/// Guess a provider name from a base URL host.
fn provider_name_for(base_url: &str) -> String {
    let host = base_url
        .split("://")
        .nth(1)
        .unwrap_or(base_url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();

    if host.contains("deepseek") {
        "deepseek".into()
    } else if host.contains("openai") {
        "openai".into()
    } else if host.contains("mistral") {
        "mistral".into()
    } else {
        "openai-compatible".into()
    }
}
