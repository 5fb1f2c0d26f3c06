use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pinbot::config::{self, Config};

// ============================================================================
// CLI Types
// ============================================================================

/// Pinbot - pins Discord messages by reaction
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Discord bot token
    #[arg(value_name = "TOKEN", env = "PINBOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(token) = resolve_token(cli.token) else {
        eprintln!("token error.");
        return ExitCode::from(1);
    };

    let config = match Config::load(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match pinbot::logging::init(&config.log) {
        Ok(Some(path)) => info!(path = %path.display(), "Logging to file"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    }

    match run(&token, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Trim the token; empty or whitespace-only counts as missing.
fn resolve_token(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn run(token: &str, config: &Config) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting pinbot");

    let cancel = CancellationToken::new();
    let signal_handle = tokio::spawn(pinbot::bot::shutdown_signal(cancel.clone()));

    let result = pinbot::bot::run(token, config, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = signal_handle.await {
        error!(error = %e, "Shutdown signal task failed");
    }

    let reason = result?;
    info!(reason = ?reason, "Pinbot stopped");
    Ok(())
}
