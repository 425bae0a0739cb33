//! CLI command definitions for the `bridgebot` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod config;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Bridge chat sessions to an AI assistant.
#[derive(Parser)]
#[command(name = "bridgebot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the admin and status REST API.
    Serve {
        /// Interface to bind (overrides `[server] host`).
        #[arg(long, env = "BRIDGEBOT_HOST")]
        host: Option<String>,

        /// Port to bind (overrides `[server] port`).
        #[arg(short, long, env = "BRIDGEBOT_PORT")]
        port: Option<u16>,

        /// Complete every pairing handshake immediately.
        #[arg(long)]
        auto_pair: bool,

        /// Also export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from(["bridgebot", "-vv", "serve", "--port", "8080", "--auto-pair"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve {
                port,
                auto_pair,
                otel,
                ..
            } => {
                assert_eq!(port, Some(8080));
                assert!(auto_pair);
                assert!(!otel);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_config_show_accepts_global_json() {
        let cli = Cli::try_parse_from(["bridgebot", "config", "show", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommand::Show
            }
        ));
    }
}
