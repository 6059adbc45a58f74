use anyhow::Context;
use background_service::{BackgroundService, ShutdownCause};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use subwatch_core::{AppConfig, Credentials, ErrorExt};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Watches subreddits and saves posts whose titles match configured keywords.
#[derive(Debug, Parser)]
#[command(name = "subwatch", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Also append log output to this file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose, cli.log.as_deref()) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    tracing::info!("Starting Subwatch");

    // Reported through the log only
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = AppConfig::load_from_path(&cli.config)
        .map_err(with_code)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let credentials = Credentials::from_env().map_err(with_code)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(forward_signals(shutdown.clone()));

    let service = BackgroundService::new(config, credentials);
    match service.run(shutdown).await.map_err(with_code)? {
        ShutdownCause::Signal => tracing::info!("Stopped by signal"),
        ShutdownCause::AuthRefreshStopped => {
            tracing::error!("Stopped because the auth token could not be refreshed")
        }
    }
    Ok(())
}

/// Prefixes an error with its stable code.
fn with_code<E>(e: E) -> anyhow::Error
where
    E: ErrorExt + std::error::Error + Send + Sync + 'static,
{
    let code = e.error_code();
    anyhow::Error::new(e).context(code)
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stdout.and(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

/// Cancels `shutdown` on Ctrl-C, or SIGTERM on unix.
async fn forward_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Received shutdown signal");
    shutdown.cancel();
}
