//! Error types for `globus-core`.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An upstream fetch failed or returned data that could not be used.
  #[error("external data source unavailable: {0}")]
  ExternalUnavailable(String),

  /// Caller-supplied parameters were rejected; keyed by field name.
  #[error("validation failed: {0:?}")]
  ValidationFailed(BTreeMap<String, String>),

  #[error("country not found: {0}")]
  NotFound(String),

  /// A country with the same (case-insensitive) name already exists.
  #[error("duplicate entry: {0}")]
  DuplicateEntry(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// A [`Error::ValidationFailed`] carrying a single field message.
  pub fn invalid(field: &str, message: impl Into<String>) -> Self {
    Self::ValidationFailed(BTreeMap::from([(field.to_owned(), message.into())]))
  }

  /// Wrap a backend error, lifting uniqueness violations into
  /// [`Error::DuplicateEntry`].
  pub fn from_store<E: crate::store::StoreError>(err: E) -> Self {
    if err.is_duplicate() {
      Self::DuplicateEntry(err.to_string())
    } else {
      Self::Store(Box::new(err))
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
