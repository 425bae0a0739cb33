//! Infrastructure layer for Bridgebot.
//!
//! Contains implementations of the ports defined in `bridgebot-core`: the
//! OpenAI-compatible chat-completions client, the in-process loopback
//! transport, plus config file loading, data-directory resolution and
//! API key lookup.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod secret;
pub mod transport;
