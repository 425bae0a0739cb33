//! LLM provider abstractions for Bridgebot.
//!
//! This module defines the core traits and the reply adapter built on them:
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `ResponderGateway`: turns (configuration, history, input) into a reply

pub mod box_provider;
pub mod provider;
pub mod responder;
