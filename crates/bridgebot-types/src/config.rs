//! Configuration types for Bridgebot.
//!
//! `BridgeConfig` represents the top-level `config.toml`; `AiConfig` is the
//! runtime assistant configuration that the admin API reads and writes.

use serde::{Deserialize, Serialize};

/// Assistant configuration used to build the directive for every reply.
///
/// An empty `business_name` means setup has not been completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub instructions: String,
}

impl AiConfig {
    /// Whether the operator has completed setup.
    pub fn is_complete(&self) -> bool {
        !self.business_name.trim().is_empty()
    }

    /// Trim user-entered free text fields.
    pub fn normalized(self) -> Self {
        Self {
            business_name: self.business_name.trim().to_string(),
            industry: self.industry,
            instructions: self.instructions.trim().to_string(),
        }
    }
}

/// Top-level configuration for the bridge.
///
/// Loaded from `~/.bridgebot/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Initial assistant configuration.
    #[serde(default)]
    pub assistant: AiConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Text-completion provider settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Transport-level timeout for one completion call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Session lifecycle and conversation buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Capacity of each session's transport event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Capacity of each peer's pending-message queue.
    #[serde(default = "default_peer_queue")]
    pub peer_queue: usize,
    /// Idle time after which a peer's worker task exits.
    #[serde(default = "default_peer_idle_secs")]
    pub peer_idle_secs: u64,
    /// History length that triggers truncation.
    #[serde(default = "default_history_high_water")]
    pub history_high_water: usize,
    /// History length kept after truncation.
    #[serde(default = "default_history_low_water")]
    pub history_low_water: usize,
    /// Delay before a completed conversation's buffer is released.
    #[serde(default = "default_release_delay_secs")]
    pub release_delay_secs: u64,
    /// Reply phrases that mark a conversation as complete. Empty disables detection.
    #[serde(default)]
    pub completion_phrases: Vec<String>,
}

fn default_event_buffer() -> usize {
    256
}

fn default_peer_queue() -> usize {
    32
}

fn default_peer_idle_secs() -> u64 {
    300
}

fn default_history_high_water() -> usize {
    20
}

fn default_history_low_water() -> usize {
    16
}

fn default_release_delay_secs() -> u64 {
    30
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            peer_queue: default_peer_queue(),
            peer_idle_secs: default_peer_idle_secs(),
            history_high_water: default_history_high_water(),
            history_low_water: default_history_low_water(),
            release_delay_secs: default_release_delay_secs(),
            completion_phrases: Vec::new(),
        }
    }
}
