//! JSON REST API for Globus.
//!
//! Exposes an axum [`Router`] backed by any [`CountryStore`], [`CountrySource`]
//! and [`ArtifactRenderer`]. Binding, TLS, and request tracing are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = globus_api::api_router(AppState::new(store, source, renderer, estimator));
//! ```

pub mod countries;
pub mod error;
pub mod status;

use std::{any::Any, sync::Arc};

use axum::{
  Json, Router,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use globus_core::{
  gdp::GdpEstimator, refresh::Refresher, render::ArtifactRenderer,
  source::CountrySource, store::CountryStore,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

pub use error::ApiError;

/// Shared handler state.
pub struct AppState<S, D, R> {
  pub store:                Arc<S>,
  pub refresher:            Arc<Refresher<S, D, R>>,
  pub renderer:             Arc<R>,
  pub estimator:            Arc<GdpEstimator>,
  /// Include internal error text in 500 bodies.
  pub expose_error_details: bool,
}

impl<S, D, R> AppState<S, D, R>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  pub fn new(
    store: Arc<S>,
    source: Arc<D>,
    renderer: Arc<R>,
    estimator: Arc<GdpEstimator>,
  ) -> Self {
    let refresher = Arc::new(Refresher::new(
      store.clone(),
      source,
      renderer.clone(),
      estimator.clone(),
    ));
    Self { store, refresher, renderer, estimator, expose_error_details: false }
  }

  pub fn expose_error_details(mut self, expose: bool) -> Self {
    self.expose_error_details = expose;
    self
  }

  pub(crate) fn fail(&self, err: globus_core::Error) -> ApiError {
    ApiError::from_core(err, self.expose_error_details)
  }
}

impl<S, D, R> Clone for AppState<S, D, R> {
  fn clone(&self) -> Self {
    Self {
      store:                self.store.clone(),
      refresher:            self.refresher.clone(),
      renderer:             self.renderer.clone(),
      estimator:            self.estimator.clone(),
      expose_error_details: self.expose_error_details,
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type. Unknown paths, and known paths hit with an
/// unsupported method, answer `404 {"error":"Endpoint not found"}`.
pub fn api_router<S, D, R>(state: AppState<S, D, R>) -> Router<()>
where
  S: CountryStore + 'static,
  D: CountrySource + 'static,
  R: ArtifactRenderer + 'static,
{
  Router::new()
    .route("/", get(status::index).fallback(not_found))
    .route("/health", get(status::health).fallback(not_found))
    .route("/status", get(status::status::<S, D, R>).fallback(not_found))
    // Countries
    .route(
      "/countries",
      get(countries::list::<S, D, R>)
        .post(countries::create::<S, D, R>)
        .fallback(not_found),
    )
    .route(
      "/countries/refresh",
      post(countries::refresh::<S, D, R>).fallback(not_found),
    )
    .route(
      "/countries/image",
      get(countries::image::<S, D, R>).fallback(not_found),
    )
    .route(
      "/countries/{name}",
      get(countries::get_one::<S, D, R>)
        .delete(countries::delete_one::<S, D, R>)
        .fallback(not_found),
    )
    .fallback(not_found)
    .layer(CatchPanicLayer::custom(panic_response))
    .with_state(state)
}

async fn not_found() -> ApiError { ApiError::NotFound("Endpoint not found") }

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
  let message = panic
    .downcast_ref::<String>()
    .map(String::as_str)
    .or_else(|| panic.downcast_ref::<&str>().copied())
    .unwrap_or("unknown panic");
  error!(panic = message, "handler panicked");
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    Json(json!({ "error": "Internal server error" })),
  )
    .into_response()
}
