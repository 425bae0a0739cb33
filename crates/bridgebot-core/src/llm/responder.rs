//! Responder gateway: the adapter between a conversation and the LLM provider.
//!
//! The gateway builds a directive from the assistant configuration, prepends
//! it to the conversation history, appends the new input as the final user
//! turn, and asks the provider for a completion.
//!
//! Failures are returned as [`ResponderError`]; substituting the degraded
//! notice is left to the single dispatch call site.

use bridgebot_types::chat::ChatMessage;
use bridgebot_types::config::AiConfig;
use bridgebot_types::llm::{CompletionRequest, LlmError};
use tracing::debug;

use super::box_provider::BoxLlmProvider;

/// Reply sent when the assistant has not been configured yet.
pub const SETUP_INCOMPLETE_NOTICE: &str =
    "🤖 This assistant is not set up yet. Please complete the setup form first.";

/// Reply sent when the completion service cannot produce an answer.
pub const DEGRADED_SERVICE_NOTICE: &str =
    "😓 Sorry, the assistant is unavailable right now. Please try again later.";

/// Errors from a single responder call.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("completion was empty")]
    EmptyReply,
}

/// Sampling options applied to every completion request.
#[derive(Debug, Clone)]
pub struct ResponderOptions {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Stateless adapter turning a conversation into a reply string.
pub struct ResponderGateway {
    provider: BoxLlmProvider,
    options: ResponderOptions,
}

impl ResponderGateway {
    pub fn new(provider: BoxLlmProvider, options: ResponderOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Produce a reply for `input` given the conversation so far.
    ///
    /// Without a business name this returns [`SETUP_INCOMPLETE_NOTICE`]
    /// without calling the provider. `history` is only read.
    pub async fn respond(
        &self,
        config: &AiConfig,
        history: &[ChatMessage],
        input: &str,
    ) -> Result<String, ResponderError> {
        if !config.is_complete() {
            return Ok(SETUP_INCOMPLETE_NOTICE.to_string());
        }

        let request = CompletionRequest {
            model: self.options.model.clone(),
            messages: build_messages(config, history, input),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        debug!(
            provider = self.provider.name(),
            messages = request.messages.len(),
            "requesting completion"
        );

        let response = self.provider.complete(&request).await?;
        let reply = response.content.trim();
        if reply.is_empty() {
            return Err(ResponderError::EmptyReply);
        }
        Ok(reply.to_string())
    }
}

/// The system directive describing the business the assistant speaks for.
pub fn directive(config: &AiConfig) -> String {
    format!(
        "You are a chat assistant for the *{}* business named *{}*.\n{}",
        config.industry, config.business_name, config.instructions
    )
    .trim()
    .to_string()
}

/// Directive, then the history, then `input` as the final user turn.
pub fn build_messages(config: &AiConfig, history: &[ChatMessage], input: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(directive(config)));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(input));
    messages
}
