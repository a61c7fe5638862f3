//! # Combined Server Binary
//!
//! Entry point for combined deployment mode.
//!
//! - Startup failure exits non-zero with the failing role and its cause.
//! - On success the roles run until Ctrl-C or SIGTERM, then stop in reverse order.

use clap::{Parser, Subcommand};
use combined_server::config::Config;
use combined_server::lifecycle::CombinedServer;
use role_framework::tracing::setup_tracing;
use std::path::PathBuf;
use tracing::{error, info};

/// Run the master, worker, log service and alert dispatcher in one process.
#[derive(Parser, Debug)]
#[command(name = "combined-server", version)]
struct Args {
    /// Path to a TOML config file
    #[arg(long, env = "COMBINED_CONFIG")]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration and exit
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    // Load .env before clap reads env-backed flags
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    if let Some(Command::PrintConfig) = args.command {
        print!("{}", config.to_toml().map_err(|e| e.to_string())?);
        return Ok(());
    }

    setup_tracing(&config.logging.level);
    info!(
        master = %config.master.listen_addr,
        worker = %config.worker.listen_addr,
        log_service = %config.log_service.listen_addr,
        on_failure = ?config.startup.on_failure,
        "Starting combined server"
    );

    let server = match CombinedServer::launch(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!(role = e.failed_role().unwrap_or("-"), error = %e, "Combined server failed to start");
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    // Returning from main would tear down the runtime the roles run on.
    wait_for_termination().await;
    server.shutdown().await;
    Ok(())
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Ctrl-C handler unavailable");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl-C handler unavailable");
        }
    }
    info!("Termination signal received");
}
