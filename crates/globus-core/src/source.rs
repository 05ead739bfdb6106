//! The `CountrySource` trait and the raw payload types it yields.
//!
//! Implemented by `globus-sources` over HTTP. The refresh pipeline depends on
//! this abstraction only, which keeps it testable with canned data.

use std::{collections::HashMap, future::Future};

use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};

/// Currency code → units of that currency per 1 USD.
pub type ExchangeRates = HashMap<String, f64>;

/// One entry of a country's `currencies` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCurrency {
  #[serde(default, deserialize_with = "lenient")]
  pub code: Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub name: Option<String>,
}

/// A country as delivered by the directory, before validation.
///
/// Every field is optional on the wire, and a field of the wrong type (a
/// negative or fractional population, a numeric name) decodes as absent
/// instead of failing the whole directory. The pipeline decides what a usable
/// entry is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCountry {
  #[serde(default, deserialize_with = "lenient")]
  pub name:       Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub capital:    Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub region:     Option<String>,
  #[serde(default, deserialize_with = "lenient")]
  pub population: Option<u64>,
  #[serde(default, deserialize_with = "lenient")]
  pub flag:       Option<String>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub currencies: Vec<RawCurrency>,
}

/// A value that is kept when it decodes as `T` and dropped otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
  Usable(T),
  Unusable(IgnoredAny),
}

impl<T> Lenient<T> {
  pub fn usable(self) -> Option<T> {
    match self {
      Self::Usable(value) => Some(value),
      Self::Unusable(_) => None,
    }
  }
}

impl Lenient<RawCountry> {
  /// A directory entry that is not an object at all becomes an empty
  /// country, which the pipeline then counts as skipped.
  pub fn into_country(self) -> RawCountry { self.usable().unwrap_or_default() }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(Option::<Lenient<T>>::deserialize(deserializer)?.and_then(Lenient::usable))
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(lenient::<D, Vec<T>>(deserializer)?.unwrap_or_default())
}

/// Abstraction over the two upstream datasets.
///
/// Implementations apply their own bounded timeout and never retry; a failed
/// call aborts the whole refresh.
pub trait CountrySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the full country directory.
  fn fetch_countries(
    &self,
  ) -> impl Future<Output = Result<Vec<RawCountry>, Self::Error>> + Send + '_;

  /// Fetch the current exchange-rate table (reference currency USD).
  fn fetch_exchange_rates(
    &self,
  ) -> impl Future<Output = Result<ExchangeRates, Self::Error>> + Send + '_;
}
