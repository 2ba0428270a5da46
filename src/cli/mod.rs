//! Command-line interface definitions.

pub mod check;
pub mod replay;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Betflow - event-driven order processing for exchange betting markets.
#[derive(Parser, Debug)]
#[command(name = "betflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a file of JSON events against a simulated client
    Replay(ReplayArgs),

    /// Validate configuration file
    Check,
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// File with one JSON-encoded event per line
    pub events: PathBuf,

    /// Fill limit orders in full as soon as they are placed
    #[arg(long)]
    pub match_orders: bool,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_replay_with_global_config() {
        let cli = Cli::try_parse_from([
            "betflow",
            "--config",
            "custom.toml",
            "replay",
            "events.jsonl",
            "--match-orders",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.events, PathBuf::from("events.jsonl"));
                assert!(args.match_orders);
                assert!(!args.json_logs);
            }
            Commands::Check => panic!("expected replay"),
        }
    }

    #[test]
    fn config_defaults_to_local_file() {
        let cli = Cli::try_parse_from(["betflow", "check"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn replay_requires_event_file() {
        assert!(Cli::try_parse_from(["betflow", "replay"]).is_err());
    }
}
