use betflow::cli::{check, replay, Cli, Commands};
use betflow::config::Config;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let args = match cli.command {
        Commands::Check => {
            if let Err(e) = check::execute(&cli.config) {
                eprintln!("✗ Configuration invalid: {e}");
                std::process::exit(1);
            }
            return;
        }
        Commands::Replay(args) => args,
    };

    let mut config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }

    config.init_logging();
    info!("betflow starting");

    tokio::select! {
        result = replay::execute(&config, &args) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("betflow stopped");
}
