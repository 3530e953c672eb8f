//! Agentry main entry point
//!
//! Command-line interface for the registry crawler: one invocation runs the
//! crawl to quiescence (or until interrupted) and leaves resumable state
//! files behind either way.

use agentry::config::load_config;
use agentry::crawler::crawl;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Agentry: a resumable crawler for a legacy agent-registry portal
///
/// Each run picks up where the previous one stopped: pages already scanned
/// and rows already recorded are never fetched again.
#[derive(Parser, Debug)]
#[command(name = "agentry")]
#[command(version)]
#[command(about = "Resumable crawler for a legacy agent-registry portal", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore persisted state and start over from page 1
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)?;

    // Ctrl-C cancels the run; whatever was collected is persisted.
    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing up");
            interrupt.cancel();
        }
    });

    crawl(config, cli.fresh, token).await?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("agentry=info,warn"),
            1 => EnvFilter::new("agentry=debug,info"),
            2 => EnvFilter::new("agentry=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
