//! The estimated-GDP metric.
//!
//! `estimated_gdp = population × multiplier ÷ exchange_rate`, where the
//! multiplier is drawn uniformly from `[1000, 2000)` for every country on every
//! refresh. The result is intentionally non-deterministic: refreshing twice
//! with identical upstream data yields different values. Tests pin the
//! randomness by seeding the estimator.

use std::{ops::Range, sync::Mutex};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::source::{ExchangeRates, RawCurrency};

/// Bounds of the per-country noise multiplier.
pub const MULTIPLIER_RANGE: Range<f64> = 1000.0..2000.0;

/// The currency code of a country: the code of the first listed currency.
pub fn currency_code(currencies: &[RawCurrency]) -> Option<&str> {
  currencies
    .first()
    .and_then(|c| c.code.as_deref())
    .map(str::trim)
    .filter(|c| !c.is_empty())
}

/// Look up a usable rate for `code`. Non-positive or non-finite rates are
/// treated as missing.
pub fn exchange_rate(rates: &ExchangeRates, code: Option<&str>) -> Option<f64> {
  code
    .and_then(|c| rates.get(c))
    .copied()
    .filter(|r| r.is_finite() && *r > 0.0)
}

/// Compute the metric with an explicit randomness source.
///
/// Returns `0` when `exchange_rate` is absent; no multiplier is drawn in that
/// case.
pub fn estimate<R: Rng + ?Sized>(
  population: u64,
  exchange_rate: Option<f64>,
  rng: &mut R,
) -> f64 {
  match exchange_rate.filter(|r| r.is_finite() && *r > 0.0) {
    Some(rate) => {
      let multiplier = rng.gen_range(MULTIPLIER_RANGE);
      population as f64 * multiplier / rate
    }
    None => 0.0,
  }
}

/// A shareable estimator owning its random number generator.
pub struct GdpEstimator {
  rng: Mutex<StdRng>,
}

impl GdpEstimator {
  /// An estimator seeded from OS entropy.
  pub fn new() -> Self { Self { rng: Mutex::new(StdRng::from_entropy()) } }

  /// An estimator with a fixed seed, for reproducible output.
  pub fn seeded(seed: u64) -> Self {
    Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
  }

  pub fn estimate(&self, population: u64, exchange_rate: Option<f64>) -> f64 {
    let mut rng = self
      .rng
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner);
    estimate(population, exchange_rate, &mut *rng)
  }
}

impl Default for GdpEstimator {
  fn default() -> Self { Self::new() }
}
