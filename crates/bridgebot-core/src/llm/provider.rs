//! LlmProvider trait definition.
//!
//! This is the core abstraction that all text-completion providers implement.
//! Uses RPITIT for `complete`; [`super::box_provider::BoxLlmProvider`] wraps
//! it for runtime provider selection.

use bridgebot_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for text-completion backends (DeepSeek, OpenAI, etc.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Implementations live in bridgebot-infra (e.g., `OpenAiCompatProvider`).
/// A provider must bound its own network calls with a timeout and report it
/// as [`LlmError::Timeout`].
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "deepseek", "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
