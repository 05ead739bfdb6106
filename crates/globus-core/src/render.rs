//! The `ArtifactRenderer` trait: turns summary statistics into an image.
//!
//! Rendering failures are never fatal to a refresh. When rendering fails the
//! pipeline records a warning and the previous artifact (if any) stays in
//! place; there is no chain of degraded fallback renderers.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::country::CountrySummary;

/// Aggregate statistics handed to the renderer after a refresh commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
  pub total_countries:   u64,
  /// Highest estimated GDP first.
  pub top_by_gdp:        Vec<CountrySummary>,
  pub last_refreshed_at: DateTime<Utc>,
}

/// A rendered, retrievable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub content_type: String,
  pub bytes:        Vec<u8>,
}

pub trait ArtifactRenderer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Render `summary` and make it available through [`Self::load`].
  fn render<'a>(
    &'a self,
    summary: &'a Summary,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The most recently rendered artifact, or `None` if nothing has been
  /// rendered yet.
  fn load(
    &self,
  ) -> impl Future<Output = Result<Option<Artifact>, Self::Error>> + Send + '_;
}
