//! Process-level wiring for the Globus server: configuration, the on-disk
//! summary renderer, and assembly of the HTTP application.

pub mod render;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use globus_api::AppState;
use globus_core::gdp::GdpEstimator;
use globus_sources::{HttpSource, SourceConfig, client};
use globus_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use render::SvgRenderer;

/// The concrete state the server runs with.
pub type ServerState = AppState<SqliteStore, HttpSource, SvgRenderer>;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `globus.toml` and
/// `GLOBUS_*` environment variables. Every key is optional.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  pub image_path:           PathBuf,
  pub countries_api_url:    String,
  pub exchange_api_url:     String,
  pub fetch_timeout_secs:   u64,
  pub expose_error_details: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "0.0.0.0".to_owned(),
      port:                 3000,
      store_path:           PathBuf::from("globus.db"),
      image_path:           PathBuf::from("cache/summary.svg"),
      countries_api_url:    client::DEFAULT_COUNTRIES_URL.to_owned(),
      exchange_api_url:     client::DEFAULT_EXCHANGE_URL.to_owned(),
      fetch_timeout_secs:   15,
      expose_error_details: false,
    }
  }
}

impl ServerConfig {
  /// Layer `GLOBUS_*` environment variables over the optional TOML file at
  /// `path`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("GLOBUS").try_parsing(true))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn source_config(&self) -> SourceConfig {
    SourceConfig {
      countries_url: self.countries_api_url.clone(),
      exchange_url:  self.exchange_api_url.clone(),
      timeout:       Duration::from_secs(self.fetch_timeout_secs),
    }
  }
}

// ─── Assembly ─────────────────────────────────────────────────────────────────

/// Open the store and build every component named by `config`.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<ServerState> {
  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let source =
    HttpSource::new(config.source_config()).context("failed to build HTTP client")?;
  let renderer = SvgRenderer::new(expand_tilde(&config.image_path));

  let state = AppState::new(
    Arc::new(store),
    Arc::new(source),
    Arc::new(renderer),
    Arc::new(GdpEstimator::new()),
  )
  .expose_error_details(config.expose_error_details);
  Ok(state)
}

/// The API router with request tracing.
pub fn app(state: ServerState) -> Router {
  globus_api::api_router(state).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
