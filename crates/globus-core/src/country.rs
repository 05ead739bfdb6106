//! Country records — the rows held by the record store.
//!
//! A country is identified by its name, compared case-insensitively. Records
//! are written whole by the refresh pipeline (or a direct create) and are never
//! partially constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Country ─────────────────────────────────────────────────────────────────

/// A persisted country record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
  pub id:                i64,
  pub name:              String,
  pub capital:           Option<String>,
  pub region:            Option<String>,
  pub population:        u64,
  /// Code of the first currency listed for the country, if any.
  pub currency_code:     Option<String>,
  /// Units of `currency_code` per 1 USD; `None` when the code is missing from
  /// the rate table.
  pub exchange_rate:     Option<f64>,
  /// Deliberately noisy derived metric, see [`crate::gdp`]. Written as `0`
  /// when no usable exchange rate exists. Both the pipeline and direct create
  /// always fill it in, so `None` is not produced through this crate; GDP
  /// orderings still place a `None` last.
  pub estimated_gdp:     Option<f64>,
  pub flag_url:          Option<String>,
  pub last_refreshed_at: DateTime<Utc>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

// ─── CountryUpsert ───────────────────────────────────────────────────────────

/// Input to [`crate::store::CountryStore::upsert`] and
/// [`crate::store::CountryStore::insert`].
///
/// Bookkeeping timestamps are always assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryUpsert {
  pub name:          String,
  pub capital:       Option<String>,
  pub region:        Option<String>,
  pub population:    u64,
  pub currency_code: Option<String>,
  pub exchange_rate: Option<f64>,
  pub estimated_gdp: Option<f64>,
  pub flag_url:      Option<String>,
}

impl CountryUpsert {
  /// Convenience constructor with every optional field empty.
  pub fn new(name: impl Into<String>, population: u64) -> Self {
    Self {
      name: name.into(),
      capital: None,
      region: None,
      population,
      currency_code: None,
      exchange_rate: None,
      estimated_gdp: None,
      flag_url: None,
    }
  }
}

// ─── Summaries ───────────────────────────────────────────────────────────────

/// A `(name, estimated_gdp)` pair as returned by
/// [`crate::store::CountryStore::top_by_gdp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
  pub name:          String,
  pub estimated_gdp: f64,
}

/// The singleton refresh-metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshStatus {
  pub total_countries:   u64,
  /// `None` until the first refresh completes.
  pub last_refreshed_at: Option<DateTime<Utc>>,
}
