//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves DeepSeek (the default),
//! OpenAI, Mistral, and local servers such as Ollama by pointing
//! `base_url` at any endpoint that speaks `POST /chat/completions`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the `Authorization` header.

pub mod config;
pub mod types;

use secrecy::{ExposeSecret, SecretString};

use bridgebot_core::llm::provider::LlmProvider;
use bridgebot_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use self::config::OpenAiCompatConfig;
use self::types::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};

/// Provider for any OpenAI-compatible chat completions API.
///
/// Does NOT derive Debug so the key can never end up in logs, same as the
/// `SecretString` inside it.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    provider_name: String,
    base_url: String,
}

impl OpenAiCompatibleProvider {
    /// Create a provider. Without an API key every call fails with
    /// [`LlmError::AuthenticationFailed`] and no request is sent.
    pub fn new(config: OpenAiCompatConfig, api_key: Option<SecretString>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            provider_name: config.provider_name,
            base_url: config.base_url,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let Some(api_key) = &self.api_key else {
            return Err(LlmError::AuthenticationFailed);
        };

        let response = self
            .client
            .post(self.url())
            .bearer_auth(api_key.expose_secret())
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Provider {
                        message: format!("HTTP request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimited { retry_after_ms },
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Provider {
                    message: format!("failed to read response body: {e}"),
                }
            }
        })?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        let usage = parsed
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        tracing::debug!(
            provider = %self.provider_name,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "completion received"
        );

        Ok(CompletionResponse {
            content,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            usage,
        })
    }
}
