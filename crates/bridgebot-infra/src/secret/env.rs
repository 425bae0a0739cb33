//! Environment variable secret provider.
//!
//! Read-only: variables are set through the shell or service manager, never
//! through Bridgebot itself.

use secrecy::SecretString;

/// Looks secrets up by environment variable name.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretProvider;

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self
    }

    /// Value of `key`, or `None` when unset, blank, or not valid Unicode.
    pub fn get(&self, key: &str) -> Option<SecretString> {
        match std::env::var(key) {
            Ok(val) if !val.trim().is_empty() => Some(SecretString::from(val.trim().to_string())),
            Ok(_) => None,
            Err(std::env::VarError::NotPresent) => None,
            // Secrets must be valid strings
            Err(std::env::VarError::NotUnicode(_)) => None,
        }
    }
}
