//! `bridgebot config show`: print the effective configuration.

use std::path::Path;

use anyhow::Result;
use console::style;
use serde_json::json;

use bridgebot_infra::config::{config_path, try_load_bridge_config};
use bridgebot_infra::secret::EnvSecretProvider;
use bridgebot_types::config::BridgeConfig;

/// Load `{data_dir}/config.toml` strictly and print it.
///
/// The API key itself is never printed, only whether its variable is set.
pub async fn show_config(data_dir: &Path, json: bool) -> Result<()> {
    let path = config_path(data_dir);
    let config = try_load_bridge_config(data_dir).await?;
    let key_set = EnvSecretProvider::new().get(&config.llm.api_key_env).is_some();

    if json {
        println!("{}", serde_json::to_string_pretty(&config_json(&config, &path, key_set))?);
        return Ok(());
    }

    let check = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };
    let or_unset = |value: &str| {
        if value.is_empty() {
            format!("{}", style("(not set)").dim())
        } else {
            value.to_string()
        }
    };

    println!();
    println!("  {} Bridgebot v{}", style("⚡").bold(), env!("CARGO_PKG_VERSION"));
    println!("  {}", style(path.display()).dim());
    println!();

    println!("  {}", style("── Server ──").dim());
    println!("  Listen:        {}", style(format!("{}:{}", config.server.host, config.server.port)).cyan());
    println!();

    println!("  {}", style("── Assistant ──").dim());
    println!("  Business:      {}", or_unset(&config.assistant.business_name));
    println!("  Industry:      {}", or_unset(&config.assistant.industry));
    println!(
        "  {} Setup {}",
        check(config.assistant.is_complete()),
        if config.assistant.is_complete() { "complete" } else { "incomplete" }
    );
    println!();

    println!("  {}", style("── LLM ──").dim());
    println!("  Endpoint:      {}", config.llm.base_url);
    println!("  Model:         {}", style(&config.llm.model).bold());
    println!("  Temperature:   {}", config.llm.temperature);
    if let Some(max_tokens) = config.llm.max_tokens {
        println!("  Max tokens:    {max_tokens}");
    }
    println!("  Timeout:       {}s", config.llm.timeout_secs);
    println!("  {} {} set", check(key_set), config.llm.api_key_env);
    println!();

    println!("  {}", style("── Sessions ──").dim());
    println!(
        "  History:       truncate above {} to {}",
        config.sessions.history_high_water, config.sessions.history_low_water
    );
    println!(
        "  Queues:        {} events, {} per peer",
        config.sessions.event_buffer, config.sessions.peer_queue
    );
    println!("  Peer workers:  retire after {}s idle", config.sessions.peer_idle_secs);
    if config.sessions.completion_phrases.is_empty() {
        println!("  Completion:    {}", style("disabled").dim());
    } else {
        println!(
            "  Completion:    {} phrase(s), release after {}s",
            config.sessions.completion_phrases.len(),
            config.sessions.release_delay_secs
        );
    }
    println!();

    Ok(())
}

fn config_json(config: &BridgeConfig, path: &Path, key_set: bool) -> serde_json::Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "config_path": path.display().to_string(),
        "server": config.server,
        "assistant": config.assistant,
        "setup_complete": config.assistant.is_complete(),
        "llm": {
            "base_url": config.llm.base_url,
            "model": config.llm.model,
            "temperature": config.llm.temperature,
            "max_tokens": config.llm.max_tokens,
            "timeout_secs": config.llm.timeout_secs,
            "api_key_env": config.llm.api_key_env,
            "api_key_set": key_set,
        },
        "sessions": config.sessions,
    })
}
