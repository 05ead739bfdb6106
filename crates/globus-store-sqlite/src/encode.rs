//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Populations are stored as
//! signed 64-bit integers and checked on the way in and out.

use chrono::{DateTime, Utc};
use globus_core::country::{Country, CountrySummary, RefreshStatus};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counts ──────────────────────────────────────────────────────────────────

pub fn encode_count(column: &'static str, n: u64) -> Result<i64> {
  i64::try_from(n).map_err(|_| Error::OutOfRange { column, value: n.to_string() })
}

pub fn decode_count(column: &'static str, n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::OutOfRange { column, value: n.to_string() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that produces a [`CountryRow`].
pub const COUNTRY_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
   exchange_rate, estimated_gdp, flag_url, last_refreshed_at, created_at, updated_at";

/// A `countries` row exactly as SQLite returns it.
pub struct CountryRow {
  pub id:                i64,
  pub name:              String,
  pub capital:           Option<String>,
  pub region:            Option<String>,
  pub population:        i64,
  pub currency_code:     Option<String>,
  pub exchange_rate:     Option<f64>,
  pub estimated_gdp:     Option<f64>,
  pub flag_url:          Option<String>,
  pub last_refreshed_at: String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl CountryRow {
  /// Map a row selected with [`COUNTRY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      name:              row.get(1)?,
      capital:           row.get(2)?,
      region:            row.get(3)?,
      population:        row.get(4)?,
      currency_code:     row.get(5)?,
      exchange_rate:     row.get(6)?,
      estimated_gdp:     row.get(7)?,
      flag_url:          row.get(8)?,
      last_refreshed_at: row.get(9)?,
      created_at:        row.get(10)?,
      updated_at:        row.get(11)?,
    })
  }

  pub fn into_country(self) -> Result<Country> {
    Ok(Country {
      id:                self.id,
      name:              self.name,
      capital:           self.capital,
      region:            self.region,
      population:        decode_count("population", self.population)?,
      currency_code:     self.currency_code,
      exchange_rate:     self.exchange_rate,
      estimated_gdp:     self.estimated_gdp,
      flag_url:          self.flag_url,
      last_refreshed_at: decode_dt(&self.last_refreshed_at)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// The `refresh_metadata` row.
pub struct StatusRow {
  pub last_refreshed_at: Option<String>,
  pub total_countries:   i64,
}

impl StatusRow {
  pub fn into_status(self) -> Result<RefreshStatus> {
    Ok(RefreshStatus {
      total_countries:   decode_count("total_countries", self.total_countries)?,
      last_refreshed_at: self.last_refreshed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CountrySummary> {
  Ok(CountrySummary { name: row.get(0)?, estimated_gdp: row.get(1)? })
}
