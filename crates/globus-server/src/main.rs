//! globus server binary.
//!
//! Reads `globus.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the JSON API or runs a single refresh.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use globus_server::{ServerConfig, app, build_state};
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Country and exchange-rate API")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "globus.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
  /// Serve the HTTP API (default).
  #[default]
  Serve,
  /// Refresh from the upstream sources once, print the report and exit.
  Refresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = ServerConfig::load(&cli.config)?;
  let state = build_state(&config).await?;

  match cli.command.unwrap_or_default() {
    Command::Refresh => {
      let report = state.refresher.run().await.context("refresh failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Command::Serve => {
      let address = config.address();
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      info!("Listening on http://{address}");
      axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
      info!("server stopped");
    }
  }

  Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to listen for SIGTERM");
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
  info!("shutdown signal received");
}
