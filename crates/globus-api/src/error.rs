//! API error type and [`axum::response::IntoResponse`] implementation.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("external data source unavailable: {0}")]
  ExternalUnavailable(String),

  #[error("validation failed: {0:?}")]
  Validation(BTreeMap<String, String>),

  /// The message is the client-facing `error` text.
  #[error("{0}")]
  NotFound(&'static str),

  #[error("duplicate entry")]
  Duplicate,

  /// `details` is `Some` only when internal error text may be exposed.
  #[error("internal server error")]
  Internal { details: Option<String> },
}

impl ApiError {
  pub fn country_not_found() -> Self { Self::NotFound("Country not found") }

  /// Map a domain error to its HTTP form. Store failures are logged here with
  /// full detail; `expose` controls whether that detail reaches the client.
  pub fn from_core(err: globus_core::Error, expose: bool) -> Self {
    use globus_core::Error as E;
    match err {
      E::ExternalUnavailable(details) => Self::ExternalUnavailable(details),
      E::ValidationFailed(fields) => Self::Validation(fields),
      E::NotFound(_) => Self::country_not_found(),
      E::DuplicateEntry(_) => Self::Duplicate,
      E::Store(source) => Self::internal(&*source, expose),
    }
  }

  pub fn internal(err: &(dyn std::error::Error + 'static), expose: bool) -> Self {
    error!(error = %err, "request failed");
    Self::Internal { details: expose.then(|| err.to_string()) }
  }

  fn rejection(field: &str, message: String) -> Self {
    Self::Validation(BTreeMap::from([(field.to_owned(), message)]))
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::rejection("body", rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::rejection("query", rejection.body_text())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::rejection("name", rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::ExternalUnavailable(details) => (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": "External data source unavailable", "details": details }),
      ),
      ApiError::Validation(details) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": "Validation failed", "details": details }),
      ),
      ApiError::NotFound(message) => {
        (StatusCode::NOT_FOUND, json!({ "error": message }))
      }
      ApiError::Duplicate => (
        StatusCode::BAD_REQUEST,
        json!({
          "error": "Duplicate entry",
          "details": "A country with this name already exists",
        }),
      ),
      ApiError::Internal { details: Some(details) } => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "Internal server error", "details": details }),
      ),
      ApiError::Internal { details: None } => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "Internal server error" }),
      ),
    };
    (status, Json(body)).into_response()
  }
}
