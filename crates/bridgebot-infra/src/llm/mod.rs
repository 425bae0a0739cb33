//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `bridgebot-core`, and a factory ([`create_provider`])
//! that builds it from the `[llm]` config section.

pub mod openai_compat;

use bridgebot_core::llm::box_provider::BoxLlmProvider;
use bridgebot_core::llm::provider::LlmProvider;
use bridgebot_core::llm::responder::ResponderOptions;
use bridgebot_types::config::LlmConfig;
use bridgebot_types::llm::LlmError;

use crate::secret::EnvSecretProvider;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from the `[llm]` config section.
///
/// The API key is read from the environment variable named by
/// `config.api_key_env`. A missing key is logged, not fatal: replies then
/// fall back to the degraded-service notice until the key is provided.
pub fn create_provider(config: &LlmConfig) -> Result<BoxLlmProvider, LlmError> {
    let api_key = EnvSecretProvider::new().get(&config.api_key_env);
    if api_key.is_none() {
        tracing::warn!(
            env = %config.api_key_env,
            "no API key found, completions will fail until it is set"
        );
    }

    let provider = OpenAiCompatibleProvider::new(OpenAiCompatConfig::from_llm_config(config), api_key)?;
    tracing::info!(
        provider = provider.name(),
        base_url = %config.base_url,
        model = %config.model,
        "LLM provider configured"
    );
    Ok(BoxLlmProvider::new(provider))
}

/// Sampling options for the responder gateway from the `[llm]` section.
pub fn responder_options(config: &LlmConfig) -> ResponderOptions {
    ResponderOptions {
        model: config.model.clone(),
        temperature: Some(config.temperature),
        max_tokens: config.max_tokens,
    }
}
