//! The refresh pipeline.
//!
//! One pass, no intermediate state persisted:
//!
//! 1. fetch the country directory and the rate table (either failing aborts
//!    the run before anything is written),
//! 2. derive a [`CountryUpsert`] per usable country, skipping entries without
//!    a name or population,
//! 3. upsert each record on its own; a failed upsert is counted and the loop
//!    moves on,
//! 4. record the refresh in the metadata row,
//! 5. render the summary artifact; failures here only produce a warning.
//!
//! Stale rows absent from the latest directory are not pruned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
  Error, Result,
  country::CountryUpsert,
  gdp::{self, GdpEstimator},
  render::{ArtifactRenderer, Summary},
  source::{CountrySource, ExchangeRates, RawCountry},
  store::CountryStore,
};

/// How many countries the summary artifact lists.
pub const SUMMARY_TOP_N: usize = 5;

// ─── Report ──────────────────────────────────────────────────────────────────

/// Outcome of a completed refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
  /// Countries that reached the upsert step.
  pub processed:         usize,
  #[serde(rename = "success")]
  pub succeeded:         usize,
  pub failed:            usize,
  /// Entries dropped for lacking a name or population.
  pub skipped:           usize,
  /// Entries delivered by the country directory.
  pub total:             usize,
  pub last_refreshed_at: DateTime<Utc>,
  /// Set when the summary artifact could not be rendered.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_warning:     Option<String>,
}

// ─── Refresher ───────────────────────────────────────────────────────────────

/// Orchestrates source → estimator → store → renderer.
///
/// Runs are serialised: a second caller waits for the in-flight refresh to
/// finish before starting its own.
pub struct Refresher<S, D, R> {
  store:     Arc<S>,
  source:    Arc<D>,
  renderer:  Arc<R>,
  estimator: Arc<GdpEstimator>,
  running:   Mutex<()>,
}

impl<S, D, R> Refresher<S, D, R>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  pub fn new(
    store: Arc<S>,
    source: Arc<D>,
    renderer: Arc<R>,
    estimator: Arc<GdpEstimator>,
  ) -> Self {
    Self { store, source, renderer, estimator, running: Mutex::new(()) }
  }

  /// Run one refresh. Only [`Error::ExternalUnavailable`] and store errors
  /// from the final metadata write are returned; per-country failures are
  /// folded into the report.
  pub async fn run(&self) -> Result<RefreshReport> {
    let _running = self.running.lock().await;
    info!("refreshing countries from external sources");

    let countries = self
      .source
      .fetch_countries()
      .await
      .map_err(|e| unavailable("Countries API", e))?;
    let rates = self
      .source
      .fetch_exchange_rates()
      .await
      .map_err(|e| unavailable("Exchange Rates API", e))?;

    let total = countries.len();
    let refreshed_at = Utc::now();
    let records = self.prepare(countries, &rates);
    let skipped = total - records.len();

    let mut succeeded = 0;
    let mut failed = 0;
    for record in records {
      let name = record.name.clone();
      match self.store.upsert(record, refreshed_at).await {
        Ok(_) => succeeded += 1,
        Err(e) => {
          warn!(country = %name, error = %e, "failed to upsert country");
          failed += 1;
        }
      }
    }

    self
      .store
      .finish_refresh(refreshed_at, succeeded as u64)
      .await
      .map_err(Error::from_store)?;

    info!(total, succeeded, failed, skipped, "country refresh committed");

    let image_warning = match self.render_summary(refreshed_at).await {
      Ok(()) => None,
      Err(message) => {
        warn!(error = %message, "summary image could not be rendered");
        Some(message)
      }
    };

    Ok(RefreshReport {
      processed: succeeded + failed,
      succeeded,
      failed,
      skipped,
      total,
      last_refreshed_at: refreshed_at,
      image_warning,
    })
  }

  /// Turn raw directory entries into upsert inputs. Draws one multiplier per
  /// country that has a usable rate.
  fn prepare(
    &self,
    countries: Vec<RawCountry>,
    rates: &ExchangeRates,
  ) -> Vec<CountryUpsert> {
    countries
      .into_iter()
      .filter_map(|raw| {
        let upsert = to_upsert(raw, rates, &self.estimator);
        if upsert.is_none() {
          warn!("skipping country without name or population");
        }
        upsert
      })
      .collect()
  }

  async fn render_summary(&self, refreshed_at: DateTime<Utc>) -> Result<(), String> {
    let top_by_gdp = self
      .store
      .top_by_gdp(SUMMARY_TOP_N)
      .await
      .map_err(|e| e.to_string())?;
    let status = self.store.status().await.map_err(|e| e.to_string())?;

    let summary = Summary {
      total_countries: status.total_countries,
      top_by_gdp,
      last_refreshed_at: refreshed_at,
    };
    self.renderer.render(&summary).await.map_err(|e| e.to_string())
  }
}

/// Build the upsert input for one directory entry, or `None` if it lacks a
/// name or population.
pub fn to_upsert(
  raw: RawCountry,
  rates: &ExchangeRates,
  estimator: &GdpEstimator,
) -> Option<CountryUpsert> {
  let name = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
  let population = raw.population?;

  let currency_code = gdp::currency_code(&raw.currencies).map(str::to_owned);
  let exchange_rate = gdp::exchange_rate(rates, currency_code.as_deref());
  let estimated_gdp = estimator.estimate(population, exchange_rate);

  Some(CountryUpsert {
    name: name.to_owned(),
    capital: raw.capital,
    region: raw.region,
    population,
    currency_code,
    exchange_rate,
    estimated_gdp: Some(estimated_gdp),
    flag_url: raw.flag,
  })
}

fn unavailable(which: &str, err: impl std::error::Error) -> Error {
  Error::ExternalUnavailable(format!("Could not fetch data from {which}: {err}"))
}

#[cfg(test)]
mod tests;
