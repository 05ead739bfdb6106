//! The `CountryStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `globus-store-sqlite`).
//! The refresh pipeline, the query service and the HTTP layer depend on this
//! abstraction, not on any concrete backend or query language.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  country::{Country, CountrySummary, CountryUpsert, RefreshStatus},
  query::{CountryFilter, SortKey},
};

/// Errors raised by a store backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// `true` when the failure was a uniqueness violation on the country name.
  fn is_duplicate(&self) -> bool;
}

/// Abstraction over the persistent country table and the singleton
/// refresh-metadata record.
///
/// Names are compared case-insensitively everywhere. Every write is atomic on
/// its own; a failed call leaves previously committed rows untouched.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CountryStore: Send + Sync {
  type Error: StoreError;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert `input`, or overwrite every field of the existing row with the
  /// same name except `name` and `created_at`. `last_refreshed_at` is set to
  /// `refreshed_at`.
  fn upsert(
    &self,
    input: CountryUpsert,
    refreshed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Country, Self::Error>> + Send + '_;

  /// Insert a new row. Fails with a duplicate error if the name is taken.
  /// The refresh-metadata count is re-synchronised to the row count.
  fn insert(
    &self,
    input: CountryUpsert,
  ) -> impl Future<Output = Result<Country, Self::Error>> + Send + '_;

  /// Delete the row with this name. Returns `false` if nothing matched.
  /// On success the refresh-metadata count is re-synchronised.
  fn delete_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Record a completed refresh in the metadata row.
  fn finish_refresh(
    &self,
    refreshed_at: DateTime<Utc>,
    total_countries: u64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All rows matching `filter`, in `sort` order.
  fn list(
    &self,
    filter: CountryFilter,
    sort: SortKey,
  ) -> impl Future<Output = Result<Vec<Country>, Self::Error>> + Send + '_;

  fn get_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Country>, Self::Error>> + Send + 'a;

  /// Read the refresh-metadata row.
  fn status(
    &self,
  ) -> impl Future<Output = Result<RefreshStatus, Self::Error>> + Send + '_;

  /// Rows with a non-null estimate, highest first, at most `limit` of them.
  fn top_by_gdp(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<CountrySummary>, Self::Error>> + Send + '_;
}
