//! Secret resolution.
//!
//! Bridgebot keeps no secret store of its own: the completion API key is
//! read from the environment and wrapped in [`secrecy::SecretString`] so it
//! never reaches logs or `Debug` output.

pub mod env;

pub use env::EnvSecretProvider;
