//! The read-side query contract: filters, sort keys and the query service.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, country::Country, store::CountryStore};

// ─── Sort keys ───────────────────────────────────────────────────────────────

/// Orderings accepted by `GET /countries?sort=...`.
///
/// GDP orderings always place `NULL` estimates last, whatever the direction.
/// Every ordering breaks ties by name so results are deterministic.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  GdpDesc,
  GdpAsc,
  PopulationDesc,
  PopulationAsc,
  #[default]
  NameAsc,
  NameDesc,
}

impl SortKey {
  pub const ALL: [SortKey; 6] = [
    SortKey::GdpDesc,
    SortKey::GdpAsc,
    SortKey::PopulationDesc,
    SortKey::PopulationAsc,
    SortKey::NameAsc,
    SortKey::NameDesc,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::GdpDesc => "gdp_desc",
      Self::GdpAsc => "gdp_asc",
      Self::PopulationDesc => "population_desc",
      Self::PopulationAsc => "population_asc",
      Self::NameAsc => "name_asc",
      Self::NameDesc => "name_desc",
    }
  }
}

impl fmt::Display for SortKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|k| k.as_str() == s)
      .ok_or_else(|| {
        let allowed: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
        Error::invalid("sort", format!("must be one of: {}", allowed.join(", ")))
      })
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Row filters for [`CountryStore::list`].
///
/// `region` matches case-insensitively; `currency` matches the stored code
/// exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryFilter {
  pub region:   Option<String>,
  pub currency: Option<String>,
}

// ─── Query service ───────────────────────────────────────────────────────────

/// Raw, unvalidated list parameters as they arrive from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryQuery {
  pub region:   Option<String>,
  pub currency: Option<String>,
  pub sort:     Option<String>,
}

impl CountryQuery {
  /// Validate into a filter and sort key. Empty strings count as absent.
  pub fn parse(&self) -> Result<(CountryFilter, SortKey)> {
    let sort = match non_empty(&self.sort) {
      Some(s) => s.parse()?,
      None => SortKey::default(),
    };
    let filter = CountryFilter {
      region:   non_empty(&self.region).map(str::to_owned),
      currency: non_empty(&self.currency).map(str::to_owned),
    };
    Ok((filter, sort))
  }

  /// Validate and run the query against `store`.
  pub async fn run<S: CountryStore>(&self, store: &S) -> Result<Vec<Country>> {
    let (filter, sort) = self.parse()?;
    store.list(filter, sort).await.map_err(Error::from_store)
  }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
