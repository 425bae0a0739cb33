//! Configuration loader for Bridgebot.
//!
//! Reads `config.toml` from the data directory (`~/.bridgebot/` in production)
//! and deserializes it into [`BridgeConfig`]. The server falls back to
//! defaults when the file is missing or malformed; `config show` uses the
//! strict variant to report problems.

use std::path::{Path, PathBuf};

use bridgebot_types::config::BridgeConfig;
use bridgebot_types::error::ConfigError;

/// Path of the config file inside `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`BridgeConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_bridge_config(data_dir: &Path) -> BridgeConfig {
    match try_load_bridge_config(data_dir).await {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            BridgeConfig::default()
        }
    }
}

/// Like [`load_bridge_config`] but returns read and parse failures.
///
/// A missing file is not an error.
pub async fn try_load_bridge_config(data_dir: &Path) -> Result<BridgeConfig, ConfigError> {
    let path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return Ok(BridgeConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str::<BridgeConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}
