//! Error type for `globus-store-sqlite`.

use globus_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A country with this name (compared case-insensitively) already exists.
  #[error("a country named {0:?} already exists")]
  Duplicate(String),

  #[error("row for {0:?} missing after write")]
  RowMissing(String),

  #[error("value out of range for column {column}: {value}")]
  OutOfRange { column: &'static str, value: String },
}

impl StoreError for Error {
  fn is_duplicate(&self) -> bool { matches!(self, Error::Duplicate(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
