//! Bridgebot CLI and REST API entry point.
//!
//! Binary name: `bridgebot`
//!
//! Parses CLI arguments, loads configuration, wires the session controller,
//! then runs the requested command or serves the REST API.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;

use bridgebot_infra::config::load_bridge_config;
use bridgebot_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use bridgebot_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, ConfigCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "bridgebot", &mut std::io::stdout());
        return Ok(());
    }

    let enable_otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), enable_otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = resolve_data_dir();

    let result = match cli.command {
        Commands::Config { action } => match action {
            ConfigCommand::Show => cli::config::show_config(&data_dir, cli.json).await,
        },

        Commands::Serve {
            host,
            port,
            auto_pair,
            ..
        } => {
            ensure_data_dir(&data_dir)
                .await
                .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
            let config = load_bridge_config(&data_dir).await;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let state = AppState::init(data_dir, config, auto_pair)?;
            serve(state, &host, port, cli.quiet).await
        }

        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}

async fn serve(state: AppState, host: &str, port: u16, quiet: bool) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    if !quiet {
        println!();
        println!(
            "  {} Bridgebot API listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!(
            "  {} transport: {}{}",
            console::style("↔").dim(),
            state.controller.transport_name(),
            if state.loopback.auto_pair() { " (auto-pair)" } else { "" }
        );
        println!(
            "  {} data dir: {}",
            console::style("↳").dim(),
            state.data_dir.display()
        );
        if !state.config.assistant.is_complete() {
            println!(
                "  {} assistant setup incomplete, PUT /api/v1/config to finish it",
                console::style("!").yellow().bold()
            );
        }
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }

    let controller = state.controller.clone();
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.shutdown().await;
    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
