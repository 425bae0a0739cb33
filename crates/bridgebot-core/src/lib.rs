//! Session lifecycle, conversation dispatch, and port traits for Bridgebot.
//!
//! This crate defines the "ports" (transport and LLM provider traits) that the
//! infrastructure layer implements, and the session core built on top of them.
//! It depends only on `bridgebot-types` -- never on `bridgebot-infra` or any
//! network crate.

pub mod chat;
pub mod config;
pub mod llm;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
