//! Error type for `globus-sources`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Network failure, timeout, or a body that failed to decode.
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("{url} returned {status}")]
  Status { url: String, status: StatusCode },

  /// The response decoded but does not carry the expected data.
  #[error("malformed response: {0}")]
  Malformed(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
