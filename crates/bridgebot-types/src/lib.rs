//! Shared domain types for Bridgebot.
//!
//! This crate contains the core domain types used across the bridge:
//! sessions, conversation messages, assistant configuration, LLM request
//! shapes, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, base64, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
