//! [`HttpSource`] — fetches the upstream datasets with `reqwest`.

use std::time::Duration;

use globus_core::source::{CountrySource, ExchangeRates, Lenient, RawCountry};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_COUNTRIES_URL: &str =
  "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_EXCHANGE_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Endpoints and the per-request timeout.
#[derive(Debug, Clone)]
pub struct SourceConfig {
  pub countries_url: String,
  pub exchange_url:  String,
  pub timeout:       Duration,
}

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      countries_url: DEFAULT_COUNTRIES_URL.to_owned(),
      exchange_url:  DEFAULT_EXCHANGE_URL.to_owned(),
      timeout:       Duration::from_secs(15),
    }
  }
}

/// Shape of the exchange-rate response. Only `rates` is required.
#[derive(Debug, Deserialize)]
struct RatesResponse {
  result: Option<String>,
  rates:  Option<ExchangeRates>,
}

/// Async HTTP client for both upstream datasets.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. Requests are
/// never retried.
#[derive(Clone)]
pub struct HttpSource {
  client: Client,
  config: SourceConfig,
}

impl HttpSource {
  pub fn new(config: SourceConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(concat!("globus/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client, config })
  }

  async fn get(&self, url: &str) -> Result<reqwest::Response> {
    debug!(url, "fetching");
    let resp = self.client.get(url).send().await?;
    if !resp.status().is_success() {
      return Err(Error::Status { url: url.to_owned(), status: resp.status() });
    }
    Ok(resp)
  }
}

impl CountrySource for HttpSource {
  type Error = Error;

  async fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
    let entries: Vec<Lenient<RawCountry>> =
      self.get(&self.config.countries_url).await?.json().await?;
    let countries: Vec<RawCountry> =
      entries.into_iter().map(Lenient::into_country).collect();
    info!(count = countries.len(), "fetched country directory");
    Ok(countries)
  }

  async fn fetch_exchange_rates(&self) -> Result<ExchangeRates> {
    let body: RatesResponse = self.get(&self.config.exchange_url).await?.json().await?;

    if let Some(result) = body.result.as_deref()
      && result != "success"
    {
      return Err(Error::Malformed(format!("exchange rate result was {result:?}")));
    }
    let rates = body
      .rates
      .ok_or_else(|| Error::Malformed("exchange rate response has no rates".to_owned()))?;

    info!(count = rates.len(), "fetched exchange rates");
    Ok(rates)
  }
}
